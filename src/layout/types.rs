use crate::ir::Margins;

/// Coordinate tolerance for "same line" tests.
pub const EPS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            left: cx - width / 2.0,
            top: cy - height / 2.0,
            right: cx + width / 2.0,
            bottom: cy + height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn expand(&self, margin: &Margins) -> Self {
        Self {
            left: self.left - margin.left,
            top: self.top - margin.top,
            right: self.right + margin.right,
            bottom: self.bottom + margin.bottom,
        }
    }

    pub fn pad(&self, amount: f32) -> Self {
        self.expand(&Margins::uniform(amount))
    }

    pub fn union(&self, other: &Rect) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Strict containment; points on the border are outside.
    pub fn contains_strict(&self, point: (f32, f32)) -> bool {
        point.0 > self.left + EPS
            && point.0 < self.right - EPS
            && point.1 > self.top + EPS
            && point.1 < self.bottom - EPS
    }

    pub fn contains(&self, point: (f32, f32)) -> bool {
        point.0 >= self.left - EPS
            && point.0 <= self.right + EPS
            && point.1 >= self.top - EPS
            && point.1 <= self.bottom + EPS
    }
}

/// Grid travel direction. Screen coordinates: `Up` decreases y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dir {
    Left,
    Right,
    Up,
    Down,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Left, Dir::Right, Dir::Up, Dir::Down];

    pub fn index(self) -> usize {
        match self {
            Dir::Left => 0,
            Dir::Right => 1,
            Dir::Up => 2,
            Dir::Down => 3,
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
        }
    }

    pub fn is_hor(self) -> bool {
        matches!(self, Dir::Left | Dir::Right)
    }

    /// Unit step as `(dx, dy)`.
    pub fn delta(self) -> (f32, f32) {
        match self {
            Dir::Left => (-1.0, 0.0),
            Dir::Right => (1.0, 0.0),
            Dir::Up => (0.0, -1.0),
            Dir::Down => (0.0, 1.0),
        }
    }

    /// Direction of travel between two points sharing a grid line.
    pub fn between(from: (f32, f32), to: (f32, f32)) -> Option<Dir> {
        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        if dx.abs() <= EPS && dy.abs() <= EPS {
            return None;
        }
        if dx.abs() >= dy.abs() {
            Some(if dx > 0.0 { Dir::Right } else { Dir::Left })
        } else {
            Some(if dy > 0.0 { Dir::Down } else { Dir::Up })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl EdgeSide {
    /// Direction leaving the node through this side.
    pub fn outward(self) -> Dir {
        match self {
            EdgeSide::Left => Dir::Left,
            EdgeSide::Right => Dir::Right,
            EdgeSide::Top => Dir::Up,
            EdgeSide::Bottom => Dir::Down,
        }
    }

    /// Direction entering the node through this side.
    pub fn inward(self) -> Dir {
        self.outward().opposite()
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, EdgeSide::Top | EdgeSide::Bottom)
    }
}

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: String,
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub margin: Margins,
    pub cluster: Option<String>,
    pub is_virtual: bool,
}

impl NodeLayout {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The drawn box.
    pub fn visible_rect(&self) -> Rect {
        Rect {
            left: self.x,
            top: self.y,
            right: self.x + self.width,
            bottom: self.y + self.height,
        }
    }

    /// The drawn box plus margins; routes never cross it.
    pub fn obstacle_rect(&self) -> Rect {
        self.visible_rect().expand(&self.margin)
    }
}

#[derive(Debug, Clone)]
pub struct ClusterLayout {
    pub id: String,
    pub rect: Rect,
    pub parent: Option<String>,
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EdgeLayout {
    pub from: String,
    pub to: String,
    /// Polyline, or a cubic Bezier control polygon when `curved` is set.
    pub points: Vec<(f32, f32)>,
    pub curved: bool,
    pub label_anchor: Option<(f32, f32)>,
    /// The geometry runs from `to` back to `from`.
    pub head_start: bool,
}

impl EdgeLayout {
    pub fn is_routed(&self) -> bool {
        self.points.len() >= 2
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub clusters: Vec<ClusterLayout>,
    pub width: f32,
    pub height: f32,
}
