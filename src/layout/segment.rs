use super::ports::RoutePort;
use super::types::{Dir, EPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegId(pub usize);

/// One axis-aligned leg of a routed edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSeg {
    /// y for horizontal segments, x for vertical ones.
    pub axis: f32,
    pub start: f32,
    pub end: f32,
    pub is_hor: bool,
    /// Travel runs from `start` to `end`.
    pub pos: bool,
    pub pre: Option<SegId>,
    pub next: Option<SegId>,
    pub can_not_move: bool,
}

impl EdgeSeg {
    fn new(axis: f32, is_hor: bool, pos: bool, run: f32) -> Self {
        Self {
            axis,
            start: run,
            end: run,
            is_hor,
            pos,
            pre: None,
            next: None,
            can_not_move: false,
        }
    }

    pub fn travel_start(&self) -> f32 {
        if self.pos { self.start } else { self.end }
    }

    pub fn travel_end(&self) -> f32 {
        if self.pos { self.end } else { self.start }
    }

    pub fn point_at(&self, run: f32) -> (f32, f32) {
        if self.is_hor {
            (run, self.axis)
        } else {
            (self.axis, run)
        }
    }

    pub fn overlaps(&self, other: &EdgeSeg) -> bool {
        self.is_hor == other.is_hor && self.end.min(other.end) - self.start.max(other.start) > EPS
    }

    fn extend(&mut self, run: f32) {
        self.start = self.start.min(run);
        self.end = self.end.max(run);
    }

    fn set_travel_start(&mut self, run: f32) {
        if self.pos {
            self.start = run;
        } else {
            self.end = run;
        }
        self.normalize();
    }

    fn set_travel_end(&mut self, run: f32) {
        if self.pos {
            self.end = run;
        } else {
            self.start = run;
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        if self.start > self.end {
            std::mem::swap(&mut self.start, &mut self.end);
            self.pos = !self.pos;
        }
    }
}

/// Arena holding the segments of every routed edge in one layout pass.
#[derive(Debug, Clone, Default)]
pub struct SegArena {
    segs: Vec<EdgeSeg>,
}

impl SegArena {
    pub fn get(&self, id: SegId) -> &EdgeSeg {
        &self.segs[id.0]
    }

    pub fn len(&self) -> usize {
        self.segs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    fn push(&mut self, seg: EdgeSeg) -> SegId {
        self.segs.push(seg);
        SegId(self.segs.len() - 1)
    }

    /// Builds the chain for a grid path ordered tail to head, walking from the
    /// head end backward. Returns `(first, last)`.
    pub fn build_chain(&mut self, points: &[(f32, f32)]) -> Option<(SegId, SegId)> {
        let mut current: Option<SegId> = None;
        let mut last: Option<SegId> = None;
        for idx in (1..points.len()).rev() {
            let from = points[idx - 1];
            let to = points[idx];
            let Some(dir) = Dir::between(from, to) else {
                continue;
            };
            let is_hor = dir.is_hor();
            let (run_from, run_to) = if is_hor { (from.0, to.0) } else { (from.1, to.1) };
            match current {
                Some(id) if self.segs[id.0].is_hor == is_hor => {
                    self.segs[id.0].extend(run_from);
                }
                _ => {
                    let axis = if is_hor { to.1 } else { to.0 };
                    let pos = matches!(dir, Dir::Right | Dir::Down);
                    let mut seg = EdgeSeg::new(axis, is_hor, pos, run_to);
                    seg.extend(run_from);
                    seg.next = current;
                    let id = self.push(seg);
                    if let Some(next) = current {
                        self.segs[next.0].pre = Some(id);
                    }
                    if last.is_none() {
                        last = Some(id);
                    }
                    current = Some(id);
                }
            }
        }
        Some((current?, last?))
    }

    /// Moves a segment to a new axis, keeping its neighbours attached.
    pub fn move_axis(&mut self, id: SegId, axis: f32) {
        let (pre, next, is_hor) = {
            let seg = &mut self.segs[id.0];
            seg.axis = axis;
            (seg.pre, seg.next, seg.is_hor)
        };
        if let Some(pre) = pre {
            let neighbour = &mut self.segs[pre.0];
            if neighbour.is_hor != is_hor {
                neighbour.set_travel_end(axis);
            }
        }
        if let Some(next) = next {
            let neighbour = &mut self.segs[next.0];
            if neighbour.is_hor != is_hor {
                neighbour.set_travel_start(axis);
            }
        }
    }

    /// Snaps the chain ends onto explicit side ports. Returns the possibly new
    /// last segment.
    pub fn adjust_port_seg(
        &mut self,
        first: SegId,
        last: SegId,
        tail_port: &RoutePort,
        head_port: &RoutePort,
        axis_tolerance: f32,
    ) -> SegId {
        if let Some((axis, run)) = tail_port.axis_and_run() {
            if self.segs[first.0].is_hor == !is_vertical_port(tail_port) {
                self.move_axis(first, axis);
                self.segs[first.0].set_travel_start(run);
                self.segs[first.0].can_not_move = true;
            }
        }

        let Some((axis, run)) = head_port.axis_and_run() else {
            return last;
        };
        if self.segs[last.0].is_hor != !is_vertical_port(head_port) {
            return last;
        }
        let mut last = last;
        if self.segs[last.0].pre.is_some() {
            self.move_axis(last, axis);
        } else {
            let mismatch = (self.segs[last.0].axis - axis).abs();
            if mismatch > axis_tolerance {
                last = self.split_tail(last, axis, run);
            } else if !self.segs[last.0].can_not_move {
                self.move_axis(last, axis);
            }
        }
        self.segs[last.0].set_travel_end(run);
        self.segs[last.0].can_not_move = true;
        last
    }

    /// Splits a lone segment whose axis disagrees with the head port into
    /// three legs joined by a connector halfway along the gap.
    pub fn split_tail(&mut self, id: SegId, port_axis: f32, port_run: f32) -> SegId {
        let (old_axis, is_hor, pos, run_start) = {
            let seg = &self.segs[id.0];
            (seg.axis, seg.is_hor, seg.pos, seg.travel_start())
        };
        let mid = (run_start + port_run) / 2.0;
        self.segs[id.0].set_travel_end(mid);

        let mut connector = EdgeSeg::new(mid, !is_hor, port_axis > old_axis, old_axis);
        connector.extend(port_axis);
        connector.pre = Some(id);
        let connector_id = self.push(connector);

        let mut tail = EdgeSeg::new(port_axis, is_hor, pos, mid);
        tail.extend(port_run);
        tail.pre = Some(connector_id);
        let tail_id = self.push(tail);

        self.segs[id.0].next = Some(connector_id);
        self.segs[connector_id.0].next = Some(tail_id);
        tail_id
    }

    /// Pins every leg of the chain passing through `point`.
    pub fn pin_through(&mut self, first: SegId, point: (f32, f32)) {
        for id in self.chain(first) {
            let seg = &mut self.segs[id.0];
            let (across, along) = if seg.is_hor {
                (point.1, point.0)
            } else {
                (point.0, point.1)
            };
            if (seg.axis - across).abs() <= EPS && along >= seg.start - EPS && along <= seg.end + EPS {
                seg.can_not_move = true;
            }
        }
    }

    pub fn chain(&self, first: SegId) -> Vec<SegId> {
        let mut out = Vec::new();
        let mut cursor = Some(first);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.segs[id.0].next;
        }
        out
    }

    /// Polyline through the chain from tail to head.
    pub fn to_points(&self, first: SegId) -> Vec<(f32, f32)> {
        let mut points = Vec::new();
        let head = &self.segs[first.0];
        points.push(head.point_at(head.travel_start()));
        for id in self.chain(first) {
            let seg = &self.segs[id.0];
            let start = seg.point_at(seg.travel_start());
            if points.last().is_some_and(|last| !same_point(*last, start)) {
                points.push(start);
            }
            points.push(seg.point_at(seg.travel_end()));
        }
        points
    }
}

fn is_vertical_port(port: &RoutePort) -> bool {
    matches!(port.line(), Some((true, _)))
}

fn same_point(a: (f32, f32), b: (f32, f32)) -> bool {
    (a.0 - b.0).abs() <= EPS && (a.1 - b.1).abs() <= EPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::EdgeSide;

    #[test]
    fn chain_merges_collinear_runs() {
        let mut arena = SegArena::default();
        let points = [(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 5.0), (10.0, 10.0), (0.0, 10.0)];
        let (first, last) = arena.build_chain(&points).unwrap();
        let chain = arena.chain(first);
        assert_eq!(chain.len(), 3);
        assert_eq!(*chain.last().unwrap(), last);
        let head = arena.get(first);
        assert!(head.is_hor && head.pos);
        assert_eq!((head.axis, head.start, head.end), (0.0, 0.0, 10.0));
        let tail = arena.get(last);
        assert!(tail.is_hor && !tail.pos);
        assert_eq!(
            arena.to_points(first),
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]
        );
    }

    #[test]
    fn pin_through_marks_legs_containing_point() {
        let mut arena = SegArena::default();
        let points = [(0.0, 0.0), (0.0, 5.0), (8.0, 5.0), (8.0, 10.0)];
        let (first, _) = arena.build_chain(&points).unwrap();
        arena.pin_through(first, (3.0, 5.0));
        let pinned: Vec<bool> = arena
            .chain(first)
            .into_iter()
            .map(|id| arena.get(id).can_not_move)
            .collect();
        assert_eq!(pinned, vec![false, true, false]);
        arena.pin_through(first, (8.0, 5.0));
        assert!(arena.get(arena.chain(first)[2]).can_not_move);
    }

    #[test]
    fn chain_alternates_orientation() {
        let mut arena = SegArena::default();
        let points = [(0.0, 0.0), (0.0, 5.0), (5.0, 5.0), (5.0, 10.0), (9.0, 10.0)];
        let (first, _) = arena.build_chain(&points).unwrap();
        let chain = arena.chain(first);
        for pair in chain.windows(2) {
            assert_ne!(arena.get(pair[0]).is_hor, arena.get(pair[1]).is_hor);
            assert_eq!(arena.get(pair[1]).pre, Some(pair[0]));
        }
    }

    #[test]
    fn move_axis_cascades_to_neighbours() {
        let mut arena = SegArena::default();
        let points = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)];
        let (first, _) = arena.build_chain(&points).unwrap();
        let middle = arena.get(first).next.unwrap();
        arena.move_axis(middle, 14.0);
        assert_eq!(
            arena.to_points(first),
            vec![(0.0, 0.0), (14.0, 0.0), (14.0, 10.0), (20.0, 10.0)]
        );
    }

    #[test]
    fn move_axis_flips_inverted_neighbour() {
        let mut arena = SegArena::default();
        let points = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)];
        let (first, last) = arena.build_chain(&points).unwrap();
        let middle = arena.get(first).next.unwrap();
        arena.move_axis(middle, 25.0);
        let tail = arena.get(last);
        assert!(!tail.pos);
        assert_eq!((tail.start, tail.end), (20.0, 25.0));
        assert_eq!(arena.to_points(first).last(), Some(&(20.0, 10.0)));
    }

    #[test]
    fn head_port_moves_last_leg() {
        let mut arena = SegArena::default();
        let points = [(0.0, 0.0), (0.0, -11.0), (20.0, -11.0), (20.0, 0.0)];
        let (first, last) = arena.build_chain(&points).unwrap();
        let tail_port = RoutePort::Side {
            side: EdgeSide::Top,
            point: (0.0, -2.0),
        };
        let head_port = RoutePort::Side {
            side: EdgeSide::Top,
            point: (21.0, -2.0),
        };
        let last = arena.adjust_port_seg(first, last, &tail_port, &head_port, 5.0);
        assert!(arena.get(first).can_not_move);
        assert!(arena.get(last).can_not_move);
        assert_eq!(
            arena.to_points(first),
            vec![(0.0, -2.0), (0.0, -11.0), (21.0, -11.0), (21.0, -2.0)]
        );
    }

    #[test]
    fn lone_segment_splits_on_large_mismatch() {
        let mut arena = SegArena::default();
        let points = [(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)];
        let (first, last) = arena.build_chain(&points).unwrap();
        let head_port = RoutePort::Side {
            side: EdgeSide::Left,
            point: (9.0, 8.0),
        };
        let last = arena.adjust_port_seg(first, last, &RoutePort::Center, &head_port, 5.0);
        assert_ne!(first, last);
        assert_eq!(
            arena.to_points(first),
            vec![(0.0, 0.0), (4.5, 0.0), (4.5, 8.0), (9.0, 8.0)]
        );
        assert_eq!(arena.chain(first).len(), 3);
    }

    #[test]
    fn lone_segment_moves_within_tolerance() {
        let mut arena = SegArena::default();
        let points = [(0.0, 0.0), (10.0, 0.0)];
        let (first, last) = arena.build_chain(&points).unwrap();
        let head_port = RoutePort::Side {
            side: EdgeSide::Left,
            point: (9.0, 1.0),
        };
        let last = arena.adjust_port_seg(first, last, &RoutePort::Center, &head_port, 5.0);
        assert_eq!(first, last);
        assert_eq!(arena.to_points(first), vec![(0.0, 1.0), (9.0, 1.0)]);
    }

    #[test]
    fn pinned_lone_segment_keeps_tail_axis() {
        let mut arena = SegArena::default();
        let points = [(0.0, 0.5), (10.0, 0.5)];
        let (first, last) = arena.build_chain(&points).unwrap();
        let tail_port = RoutePort::Side {
            side: EdgeSide::Right,
            point: (1.0, 0.5),
        };
        let head_port = RoutePort::Side {
            side: EdgeSide::Left,
            point: (9.0, -0.5),
        };
        arena.adjust_port_seg(first, last, &tail_port, &head_port, 5.0);
        assert_eq!(arena.to_points(first), vec![(1.0, 0.5), (9.0, 0.5)]);
    }
}
