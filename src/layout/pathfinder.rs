use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::config::OrthoConfig;

use super::error::LayoutError;
use super::maze::{Cell, CellId, Maze, VertexId};
use super::ports::RoutePort;
use super::types::{Dir, EdgeSide, Rect, EPS};

// ── Bend lower bounds ───────────────────────────────────────────────

/// Bends needed to reach a point while heading somewhere, indexed by
/// `[forward < 0, forward == 0, forward > 0][lateral == 0, lateral != 0]`.
const BEND_NUM_TABLE: [[u32; 2]; 3] = [[3, 2], [0, 1], [0, 1]];

/// Bends needed to enter a node side moving inward. Rows: position relative
/// to the side line (before/after) and to its span (in/out). Columns: heading
/// relative to the inward direction.
const TARGET_SIDE_TABLE: [[u32; 5]; 4] = [
    // Fwd Back Toward Away None
    [0, 2, 1, 1, 0], // before, in
    [2, 2, 1, 3, 1], // before, out
    [4, 2, 3, 3, 2], // after, in
    [4, 2, 3, 3, 2], // after, out
];

const NO_DIR_SLOT: u8 = 4;

/// Lexicographic route cost: bends, then centering, then length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cost {
    pub bends: u32,
    pub centering: f32,
    pub len: f32,
}

impl Cost {
    pub fn compare(&self, other: &Cost) -> Ordering {
        self.bends
            .cmp(&other.bends)
            .then_with(|| self.centering.total_cmp(&other.centering))
            .then_with(|| self.len.total_cmp(&other.len))
    }
}

/// Search frontier record for one (vertex, arrival direction, guide index).
#[derive(Debug, Clone, Copy)]
pub struct VertexDir {
    pub vertex: VertexId,
    pub dir: Option<Dir>,
    pub parent: Option<usize>,
    pub bends: u32,
    pub centering: f32,
    pub len: f32,
    pub sign_idx: usize,
    pub est_bends: u32,
    pub est_len: f32,
    version: u32,
}

impl VertexDir {
    fn actual(&self) -> Cost {
        Cost {
            bends: self.bends,
            centering: self.centering,
            len: self.len,
        }
    }

    fn estimated(&self) -> Cost {
        Cost {
            bends: self.bends + self.est_bends,
            centering: self.centering,
            len: self.len + self.est_len,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StateKey {
    vertex: VertexId,
    dir_slot: u8,
    sign_idx: usize,
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    cost: Cost,
    seq: u64,
    record: usize,
    version: u32,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .compare(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

/// Open set of one edge search: the record arena, its key index and the
/// priority queue. Reused across edges and cleared after each.
#[derive(Debug, Default)]
pub struct PathContent {
    records: Vec<VertexDir>,
    index: HashMap<StateKey, usize>,
    heap: BinaryHeap<QueueEntry>,
    seq: u64,
}

impl PathContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
        self.heap.clear();
        self.seq = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.heap.is_empty()
    }

    fn enqueue(&mut self, record: usize) {
        let entry = QueueEntry {
            cost: self.records[record].estimated(),
            seq: self.seq,
            record,
            version: self.records[record].version,
        };
        self.seq += 1;
        self.heap.push(entry);
    }
}

pub struct RouteRequest<'a> {
    pub source: CellId,
    pub target: CellId,
    pub tail_port: RoutePort,
    pub head_port: RoutePort,
    pub guides: &'a [CellId],
}

#[derive(Debug, Clone)]
pub struct FoundPath {
    pub vertices: Vec<VertexId>,
    pub points: Vec<(f32, f32)>,
    pub bends: u32,
    pub len: f32,
    pub expansions: usize,
}

#[derive(Debug, Clone, Copy)]
enum Goal {
    Point((f32, f32)),
    Side { side: EdgeSide, rect: Rect },
}

fn manhattan(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

fn point_bends(from: (f32, f32), heading: Option<Dir>, to: (f32, f32)) -> u32 {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let Some(heading) = heading else {
        return if dx.abs() <= EPS || dy.abs() <= EPS { 0 } else { 1 };
    };
    let (fx, fy) = heading.delta();
    let forward = dx * fx + dy * fy;
    let lateral = if heading.is_hor() { dy } else { dx };
    let row = if forward < -EPS {
        0
    } else if forward.abs() <= EPS {
        1
    } else {
        2
    };
    let col = usize::from(lateral.abs() > EPS);
    BEND_NUM_TABLE[row][col]
}

fn side_geometry(side: EdgeSide, rect: &Rect, at: (f32, f32)) -> (f32, f32, f32, f32) {
    // (distance ahead along the inward direction, lateral coordinate, span)
    match side {
        EdgeSide::Top => (rect.top - at.1, at.0, rect.left, rect.right),
        EdgeSide::Bottom => (at.1 - rect.bottom, at.0, rect.left, rect.right),
        EdgeSide::Left => (rect.left - at.0, at.1, rect.top, rect.bottom),
        EdgeSide::Right => (at.0 - rect.right, at.1, rect.top, rect.bottom),
    }
}

fn side_bends(from: (f32, f32), heading: Option<Dir>, side: EdgeSide, rect: &Rect) -> u32 {
    let (ahead, lateral, lo, hi) = side_geometry(side, rect, from);
    let before = ahead > -EPS;
    let inside = lateral >= lo - EPS && lateral <= hi + EPS;
    let row = match (before, inside) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    };
    let inward = side.inward();
    let col = match heading {
        None => 4,
        Some(dir) if dir == inward => 0,
        Some(dir) if dir == inward.opposite() => 1,
        Some(dir) => {
            let (dx, dy) = dir.delta();
            let step = if side.is_vertical() { dx } else { dy };
            let toward = inside || (lateral < lo && step > 0.0) || (lateral > hi && step < 0.0);
            if toward { 2 } else { 3 }
        }
    };
    TARGET_SIDE_TABLE[row][col]
}

fn side_len(from: (f32, f32), side: EdgeSide, rect: &Rect) -> f32 {
    let (ahead, lateral, lo, hi) = side_geometry(side, rect, from);
    let off_span = (lo - lateral).max(lateral - hi).max(0.0);
    ahead.abs() + off_span
}

struct Search<'a> {
    maze: &'a Maze,
    source_id: CellId,
    target_id: CellId,
    target: &'a Cell,
    tail_side: Option<EdgeSide>,
    head_side: Option<EdgeSide>,
    goal: Goal,
    guide_points: Vec<(f32, f32)>,
    guide_vertices: Vec<VertexId>,
}

impl Search<'_> {
    fn estimate(&self, at: (f32, f32), heading: Option<Dir>, sign_idx: usize) -> (u32, f32) {
        let mut bends = 0;
        let mut len = 0.0;
        let mut at = at;
        let mut heading = heading;
        for &guide in self.guide_points.iter().skip(sign_idx) {
            bends += point_bends(at, heading, guide);
            len += manhattan(at, guide);
            at = guide;
            heading = None;
        }
        match self.goal {
            Goal::Point(point) => {
                bends += point_bends(at, heading, point);
                len += manhattan(at, point);
            }
            Goal::Side { side, rect } => {
                bends += side_bends(at, heading, side, &rect);
                len += side_len(at, side, &rect);
            }
        }
        (bends, len)
    }

    fn advance(&self, mut sign_idx: usize, vertex: VertexId) -> usize {
        while self.guide_vertices.get(sign_idx) == Some(&vertex) {
            sign_idx += 1;
        }
        sign_idx
    }

    fn accepts(&self, record: &VertexDir) -> bool {
        if record.sign_idx != self.guide_vertices.len() {
            return false;
        }
        if self.maze.internal_cell(record.vertex) != Some(self.target_id) {
            return false;
        }
        match self.head_side {
            None => self.target.center_vertex == Some(record.vertex),
            Some(side) => record.dir == Some(side.inward()),
        }
    }

    /// Whether the move from `from` in `dir` is legal for this search.
    fn allows(&self, record: &VertexDir, dir: Dir, to: VertexId) -> Result<bool, LayoutError> {
        let maze = self.maze;
        let from = maze
            .vertex(record.vertex)
            .ok_or(LayoutError::UnknownVertex(record.vertex.0))?;
        let next = maze.vertex(to).ok_or(LayoutError::UnknownVertex(to.0))?;
        let from_mark = from.internal;
        let from_cell = from_mark.map(|mark| mark.cell);

        if let Some(mark) = from_mark.filter(|mark| mark.cell == self.source_id) {
            // A side tail port leaves along its own line only, whatever else the
            // vertex's exit set allows.
            if let Some(side) = self.tail_side {
                if dir != side.outward() {
                    return Ok(false);
                }
            } else if !mark.exits.is_empty() {
                if !mark.exits.contains(dir) {
                    return Ok(false);
                }
            } else if record.dir.is_some_and(|heading| heading != dir) {
                return Ok(false);
            }
        }

        let allowed = match next.internal {
            Some(mark) if mark.cell == self.source_id => from_cell == Some(self.source_id),
            Some(mark) if mark.cell == self.target_id => {
                let faces = mark.exits.is_empty() || mark.exits.contains(dir.opposite());
                let entering = from_cell != Some(self.target_id);
                let inward = match (entering, self.head_side) {
                    (true, Some(side)) => dir == side.inward(),
                    _ => true,
                };
                faces && inward
            }
            Some(_) => false,
            None => from_cell != Some(self.target_id),
        };
        Ok(allowed)
    }
}

fn relax(
    content: &mut PathContent,
    search: &Search<'_>,
    candidate: VertexDir,
) -> Result<(), LayoutError> {
    let key = StateKey {
        vertex: candidate.vertex,
        dir_slot: candidate.dir.map_or(NO_DIR_SLOT, |dir| dir.index() as u8),
        sign_idx: candidate.sign_idx,
    };
    if let Some(&id) = content.index.get(&key) {
        let record = &mut content.records[id];
        if candidate.actual().compare(&record.actual()) != Ordering::Less {
            return Ok(());
        }
        record.parent = candidate.parent;
        record.bends = candidate.bends;
        record.centering = candidate.centering;
        record.len = candidate.len;
        record.version += 1;
        content.enqueue(id);
        return Ok(());
    }

    let point = search
        .maze
        .vertex(candidate.vertex)
        .ok_or(LayoutError::UnknownVertex(candidate.vertex.0))?
        .point();
    let (est_bends, est_len) = search.estimate(point, candidate.dir, candidate.sign_idx);
    let id = content.records.len();
    content.records.push(VertexDir {
        est_bends,
        est_len,
        version: 0,
        ..candidate
    });
    content.index.insert(key, id);
    content.enqueue(id);
    Ok(())
}

/// Minimum-bend route between two cells through the ordered guide cells.
/// `Ok(None)` means no route exists within the expansion budget.
pub fn route(
    maze: &Maze,
    content: &mut PathContent,
    request: &RouteRequest<'_>,
    config: &OrthoConfig,
) -> Result<Option<FoundPath>, LayoutError> {
    let source = maze
        .cell(request.source)
        .ok_or(LayoutError::UnknownCell(request.source.0))?;
    let target = maze
        .cell(request.target)
        .ok_or(LayoutError::UnknownCell(request.target.0))?;

    let mut guide_points = Vec::with_capacity(request.guides.len());
    let mut guide_vertices = Vec::with_capacity(request.guides.len());
    for guide in request.guides {
        let cell = maze
            .cell(*guide)
            .ok_or(LayoutError::UnknownCell(guide.0))?;
        let Some(vertex) = cell.center_vertex else {
            return Ok(None);
        };
        guide_points.push(cell.center);
        guide_vertices.push(vertex);
    }

    let (goal, head_side) = match request.head_port {
        RoutePort::Center => {
            if target.center_vertex.is_none() {
                return Ok(None);
            }
            (Goal::Point(target.center), None)
        }
        RoutePort::Side { side, .. } => (
            Goal::Side {
                side,
                rect: target.obstacle,
            },
            Some(side),
        ),
    };

    let search = Search {
        maze,
        source_id: request.source,
        target_id: request.target,
        target,
        tail_side: match request.tail_port {
            RoutePort::Center => None,
            RoutePort::Side { side, .. } => Some(side),
        },
        head_side,
        goal,
        guide_points,
        guide_vertices,
    };

    content.clear();
    let mut seeds: Vec<(VertexId, Option<Dir>)> = Vec::new();
    match request.tail_port {
        RoutePort::Center => {
            if let Some(vertex) = source.center_vertex {
                seeds.push((vertex, None));
            }
        }
        RoutePort::Side { side, point } => {
            let outward = side.outward();
            for &vertex_id in &source.axis_vertices {
                let vertex = maze
                    .vertex(vertex_id)
                    .ok_or(LayoutError::UnknownVertex(vertex_id.0))?;
                let on_line = if side.is_vertical() {
                    (vertex.x - point.0).abs() <= config.port_tolerance
                } else {
                    (vertex.y - point.1).abs() <= config.port_tolerance
                };
                let exits_outward = vertex
                    .internal
                    .is_some_and(|mark| mark.exits.is_empty() || mark.exits.contains(outward));
                if on_line && exits_outward {
                    seeds.push((vertex_id, Some(outward)));
                }
            }
        }
    }

    for (vertex_id, dir) in seeds {
        let point = maze
            .vertex(vertex_id)
            .ok_or(LayoutError::UnknownVertex(vertex_id.0))?
            .point();
        relax(
            content,
            &search,
            VertexDir {
                vertex: vertex_id,
                dir,
                parent: None,
                bends: 0,
                centering: distance(point, source.center),
                len: 0.0,
                sign_idx: search.advance(0, vertex_id),
                est_bends: 0,
                est_len: 0.0,
                version: 0,
            },
        )?;
    }

    let mut expansions = 0usize;
    while let Some(entry) = content.heap.pop() {
        let record = content.records[entry.record];
        if entry.version != record.version {
            continue;
        }
        expansions += 1;
        if expansions > config.max_expansions {
            tracing::warn!(
                expansions,
                limit = config.max_expansions,
                "orthogonal search exceeded its expansion budget"
            );
            return Ok(None);
        }
        if search.accepts(&record) {
            return Ok(Some(reconstruct(maze, content, entry.record, expansions)?));
        }

        let vertex = maze
            .vertex(record.vertex)
            .ok_or(LayoutError::UnknownVertex(record.vertex.0))?;
        for dir in Dir::ALL {
            if record.dir == Some(dir.opposite()) {
                continue;
            }
            let Some(next_id) = vertex.neighbor(dir) else {
                continue;
            };
            if !search.allows(&record, dir, next_id)? {
                continue;
            }
            let next = maze
                .vertex(next_id)
                .ok_or(LayoutError::UnknownVertex(next_id.0))?;
            let turned = record.dir.is_some_and(|heading| heading != dir);
            relax(
                content,
                &search,
                VertexDir {
                    vertex: next_id,
                    dir: Some(dir),
                    parent: Some(entry.record),
                    bends: record.bends + u32::from(turned),
                    centering: record.centering,
                    len: record.len + distance(vertex.point(), next.point()),
                    sign_idx: search.advance(record.sign_idx, next_id),
                    est_bends: 0,
                    est_len: 0.0,
                    version: 0,
                },
            )?;
        }
    }

    tracing::trace!(expansions, "orthogonal search exhausted");
    Ok(None)
}

fn reconstruct(
    maze: &Maze,
    content: &PathContent,
    terminal: usize,
    expansions: usize,
) -> Result<FoundPath, LayoutError> {
    let mut vertices = Vec::new();
    let mut cursor = Some(terminal);
    while let Some(id) = cursor {
        let record = &content.records[id];
        vertices.push(record.vertex);
        cursor = record.parent;
    }
    vertices.reverse();
    let points = vertices
        .iter()
        .map(|id| {
            maze.vertex(*id)
                .map(|vertex| vertex.point())
                .ok_or(LayoutError::UnknownVertex(id.0))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let record = &content.records[terminal];
    Ok(FoundPath {
        vertices,
        points,
        bends: record.bends,
        len: record.len,
        expansions,
    })
}
