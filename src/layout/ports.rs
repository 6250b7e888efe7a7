use crate::ir::Compass;

use super::types::{EdgeSide, NodeLayout, EPS};

/// Where a routed edge attaches to its node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoutePort {
    /// Free attachment; the route starts or ends at the node center and is
    /// clipped against the node box afterwards.
    Center,
    /// Fixed attachment on one side of the node box.
    Side { side: EdgeSide, point: (f32, f32) },
}

impl RoutePort {
    pub fn is_center(&self) -> bool {
        matches!(self, RoutePort::Center)
    }

    /// The grid line a side port's stub runs along: `(vertical, coordinate)`.
    pub fn line(&self) -> Option<(bool, f32)> {
        match *self {
            RoutePort::Center => None,
            RoutePort::Side { side, point } => {
                if side.is_vertical() {
                    Some((true, point.0))
                } else {
                    Some((false, point.1))
                }
            }
        }
    }

    /// Port coordinate across the stub, and along it.
    pub fn axis_and_run(&self) -> Option<(f32, f32)> {
        match *self {
            RoutePort::Center => None,
            RoutePort::Side { side, point } => {
                if side.is_vertical() {
                    Some((point.0, point.1))
                } else {
                    Some((point.1, point.0))
                }
            }
        }
    }
}

/// Side a port at the given half-extent ratios leaves through. Diagonal
/// offsets favour the vertical sides.
pub(super) fn exit_side(rx: f32, ry: f32) -> Option<EdgeSide> {
    if rx.abs() <= EPS && ry.abs() <= EPS {
        return None;
    }
    if ry.abs() >= rx.abs() {
        Some(if ry < 0.0 { EdgeSide::Top } else { EdgeSide::Bottom })
    } else {
        Some(if rx < 0.0 { EdgeSide::Left } else { EdgeSide::Right })
    }
}

/// Port used by the maze router. Corner compass points collapse onto the
/// top or bottom side, inset to a quarter of the width.
pub(super) fn resolve_ortho_port(node: &NodeLayout, compass: Option<Compass>) -> RoutePort {
    let Some(compass) = compass else {
        return RoutePort::Center;
    };
    let (rx, ry) = compass.ratios();
    let Some(side) = exit_side(rx, ry) else {
        return RoutePort::Center;
    };
    let rect = node.visible_rect();
    let (cx, cy) = rect.center();
    let point = match side {
        EdgeSide::Top => (cx + rx * rect.width() / 4.0, rect.top),
        EdgeSide::Bottom => (cx + rx * rect.width() / 4.0, rect.bottom),
        EdgeSide::Left => (rect.left, cy + ry * rect.height() / 4.0),
        EdgeSide::Right => (rect.right, cy + ry * rect.height() / 4.0),
    };
    RoutePort::Side { side, point }
}

/// Exact compass point on the node box, used for straight and curved edges.
pub(super) fn compass_point(node: &NodeLayout, compass: Compass) -> Option<(f32, f32)> {
    let (rx, ry) = compass.ratios();
    if rx == 0.0 && ry == 0.0 {
        return None;
    }
    let (cx, cy) = node.center();
    Some((cx + rx * node.width / 2.0, cy + ry * node.height / 2.0))
}
