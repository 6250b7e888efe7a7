use std::collections::HashMap;

use super::types::{Rect, EPS};

// ── Path comparison ─────────────────────────────────────────────────
/// Coordinates closer than this are treated as the same point.
const POINT_MERGE_EPS: f32 = 1e-4;
/// Cross products below this count as collinear.
const COLLINEAR_EPS: f32 = 1e-4;

// ── Endpoint clipping ───────────────────────────────────────────────

/// Shape of an edge's point list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Polyline through every point.
    Straight,
    /// Cubic Bezier control polygon `[start, c1, c2, end]`.
    Curve,
}

/// Trims edge endpoints that start inside a node box back to its border.
pub trait PathClip {
    fn clip_tail(&self, points: &mut Vec<(f32, f32)>, rect: &Rect);
    fn clip_head(&self, points: &mut Vec<(f32, f32)>, rect: &Rect);
}

pub struct StraightClip;

pub struct CurveClip;

impl PathKind {
    pub fn clipper(self) -> &'static dyn PathClip {
        match self {
            PathKind::Straight => &StraightClip,
            PathKind::Curve => &CurveClip,
        }
    }
}

impl PathClip for StraightClip {
    fn clip_tail(&self, points: &mut Vec<(f32, f32)>, rect: &Rect) {
        if points.len() < 2 || !rect.contains_strict(points[0]) {
            return;
        }
        let mut idx = 0;
        while idx + 1 < points.len() && rect.contains_strict(points[idx + 1]) {
            idx += 1;
        }
        if idx + 1 >= points.len() {
            return;
        }
        let exit = segment_rect_exit(points[idx], points[idx + 1], rect);
        points.drain(0..=idx);
        points.insert(0, exit);
    }

    fn clip_head(&self, points: &mut Vec<(f32, f32)>, rect: &Rect) {
        points.reverse();
        self.clip_tail(points, rect);
        points.reverse();
    }
}

impl PathClip for CurveClip {
    fn clip_tail(&self, points: &mut Vec<(f32, f32)>, rect: &Rect) {
        if points.len() != 4 {
            StraightClip.clip_tail(points, rect);
            return;
        }
        if let Some(exit) = ray_rect_exit(points[0], points[1], points[3], rect) {
            points[0] = exit;
        }
    }

    fn clip_head(&self, points: &mut Vec<(f32, f32)>, rect: &Rect) {
        if points.len() != 4 {
            StraightClip.clip_head(points, rect);
            return;
        }
        if let Some(exit) = ray_rect_exit(points[3], points[2], points[0], rect) {
            points[3] = exit;
        }
    }
}

/// Where the segment from an inside point to an outside point leaves `rect`.
pub(super) fn segment_rect_exit(inside: (f32, f32), outside: (f32, f32), rect: &Rect) -> (f32, f32) {
    let dx = outside.0 - inside.0;
    let dy = outside.1 - inside.1;
    let t = exit_param(inside, (dx, dy), rect).clamp(0.0, 1.0);
    (inside.0 + dx * t, inside.1 + dy * t)
}

/// Moves `origin` along the ray toward `toward` (or `fallback` when the two
/// coincide) until it leaves `rect`. `None` when `origin` is already outside.
pub(super) fn ray_rect_exit(
    origin: (f32, f32),
    toward: (f32, f32),
    fallback: (f32, f32),
    rect: &Rect,
) -> Option<(f32, f32)> {
    if !rect.contains_strict(origin) {
        return None;
    }
    let mut dx = toward.0 - origin.0;
    let mut dy = toward.1 - origin.1;
    if dx.abs() <= EPS && dy.abs() <= EPS {
        dx = fallback.0 - origin.0;
        dy = fallback.1 - origin.1;
    }
    if dx.abs() <= EPS && dy.abs() <= EPS {
        return None;
    }
    let t = exit_param(origin, (dx, dy), rect);
    Some((origin.0 + dx * t, origin.1 + dy * t))
}

fn exit_param(origin: (f32, f32), delta: (f32, f32), rect: &Rect) -> f32 {
    let tx = if delta.0 > 0.0 {
        (rect.right - origin.0) / delta.0
    } else if delta.0 < 0.0 {
        (rect.left - origin.0) / delta.0
    } else {
        f32::INFINITY
    };
    let ty = if delta.1 > 0.0 {
        (rect.bottom - origin.1) / delta.1
    } else if delta.1 < 0.0 {
        (rect.top - origin.1) / delta.1
    } else {
        f32::INFINITY
    };
    tx.min(ty).max(0.0)
}

// ── Path metrics ────────────────────────────────────────────────────

pub(super) fn compress_path(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for &point in points {
        if let Some(prev) = out.last() {
            if (point.0 - prev.0).abs() <= POINT_MERGE_EPS && (point.1 - prev.1).abs() <= POINT_MERGE_EPS {
                continue;
            }
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let cross = (b.0 - a.0) * (point.1 - b.1) - (b.1 - a.1) * (point.0 - b.0);
            let forward = (b.0 - a.0) * (point.0 - b.0) + (b.1 - a.1) * (point.1 - b.1);
            if cross.abs() <= COLLINEAR_EPS && forward >= 0.0 {
                out.pop();
            }
        }
        out.push(point);
    }
    out
}

pub fn path_length(points: &[(f32, f32)]) -> f32 {
    points
        .windows(2)
        .map(|w| {
            let dx = w[1].0 - w[0].0;
            let dy = w[1].1 - w[0].1;
            (dx * dx + dy * dy).sqrt()
        })
        .sum()
}

pub fn path_bend_count(points: &[(f32, f32)]) -> usize {
    if points.len() < 3 {
        return 0;
    }
    let mut bends = 0usize;
    for w in points.windows(3) {
        let (p0, p1, p2) = (w[0], w[1], w[2]);
        let dx1 = p1.0 - p0.0;
        let dy1 = p1.1 - p0.1;
        let dx2 = p2.0 - p1.0;
        let dy2 = p2.1 - p1.1;
        if (dx1.abs() <= POINT_MERGE_EPS && dy1.abs() <= POINT_MERGE_EPS)
            || (dx2.abs() <= POINT_MERGE_EPS && dy2.abs() <= POINT_MERGE_EPS)
        {
            continue;
        }
        if (dx1 * dy2 - dy1 * dx2).abs() > COLLINEAR_EPS {
            bends += 1;
        }
    }
    bends
}

pub(super) fn bezier_point(control: &[(f32, f32)], t: f32) -> (f32, f32) {
    let [p0, p1, p2, p3] = match control {
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => return control.first().copied().unwrap_or_default(),
    };
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    (
        b0 * p0.0 + b1 * p1.0 + b2 * p2.0 + b3 * p3.0,
        b0 * p0.1 + b1 * p1.1 + b2 * p2.1 + b3 * p3.1,
    )
}

// ── Labels ──────────────────────────────────────────────────────────

/// Midpoint of the longest leg, ignoring the first and last legs when the
/// path has enough of them.
pub(super) fn edge_label_anchor_from_points(points: &[(f32, f32)]) -> Option<(f32, f32)> {
    if points.len() < 2 {
        return None;
    }
    let segment_count = points.len() - 1;
    let (start_idx, end_idx) = if segment_count >= 3 {
        (1, segment_count - 1)
    } else {
        (0, segment_count)
    };
    let mut best_idx = start_idx;
    let mut best_len = -1.0f32;
    for idx in start_idx..end_idx {
        let p1 = points[idx];
        let p2 = points[idx + 1];
        let len = (p2.0 - p1.0).powi(2) + (p2.1 - p1.1).powi(2);
        if len > best_len {
            best_len = len;
            best_idx = idx;
        }
    }
    let p1 = points[best_idx];
    let p2 = points[best_idx + 1];
    Some(((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0))
}

pub(super) fn edge_label_anchor(
    points: &[(f32, f32)],
    kind: PathKind,
    guides: &[(f32, f32)],
) -> Option<(f32, f32)> {
    if points.len() < 2 {
        return None;
    }
    if !guides.is_empty() {
        return Some(guides[guides.len() / 2]);
    }
    match kind {
        PathKind::Curve if points.len() == 4 => Some(bezier_point(points, 0.5)),
        _ => edge_label_anchor_from_points(points),
    }
}

// ── Edge grouping ───────────────────────────────────────────────────

pub(super) fn edge_pair_key(edge: &crate::ir::Edge) -> (String, String) {
    if edge.from <= edge.to {
        (edge.from.clone(), edge.to.clone())
    } else {
        (edge.to.clone(), edge.from.clone())
    }
}

/// Edge indices grouped by unordered endpoint pair, in first-seen order.
pub(super) fn group_parallel_edges(
    edges: &[crate::ir::Edge],
    include: impl Fn(usize, &crate::ir::Edge) -> bool,
) -> Vec<((String, String), Vec<usize>)> {
    let mut slots: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<((String, String), Vec<usize>)> = Vec::new();
    for (idx, edge) in edges.iter().enumerate() {
        if !include(idx, edge) {
            continue;
        }
        let key = edge_pair_key(edge);
        match slots.get(&key) {
            Some(&slot) => groups[slot].1.push(idx),
            None => {
                slots.insert(key.clone(), groups.len());
                groups.push((key, vec![idx]));
            }
        }
    }
    groups
}

// ── Obstacle checks ─────────────────────────────────────────────────

/// Whether the segment passes through the interior of `rect`.
pub(super) fn segment_crosses_rect(a: (f32, f32), b: (f32, f32), rect: &Rect) -> bool {
    if rect.contains_strict(a) || rect.contains_strict(b) {
        return true;
    }
    let mid = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
    if rect.contains_strict(mid) {
        return true;
    }
    let corners = [
        (rect.left, rect.top),
        (rect.right, rect.top),
        (rect.right, rect.bottom),
        (rect.left, rect.bottom),
    ];
    let mut hits = 0;
    for i in 0..4 {
        if segments_cross(a, b, corners[i], corners[(i + 1) % 4]) {
            hits += 1;
        }
    }
    hits >= 2
}

fn segments_cross(a: (f32, f32), b: (f32, f32), c: (f32, f32), d: (f32, f32)) -> bool {
    fn orient(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
        (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
    }
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);
    (o1 > 0.0 && o2 < 0.0 || o1 < 0.0 && o2 > 0.0) && (o3 > 0.0 && o4 < 0.0 || o3 < 0.0 && o4 > 0.0)
}

/// Number of legs that pass through one of `rects`.
pub(super) fn path_obstacle_intersections(points: &[(f32, f32)], rects: &[Rect]) -> usize {
    points
        .windows(2)
        .filter(|w| rects.iter().any(|rect| segment_crosses_rect(w[0], w[1], rect)))
        .count()
}
