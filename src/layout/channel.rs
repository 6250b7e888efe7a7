use std::collections::BTreeMap;

use super::maze::Maze;
use super::segment::{EdgeSeg, SegArena, SegId};
use super::types::EPS;

/// Routed edge entry: the chain's first leg touches the tail node, the last
/// leg the head node.
#[derive(Debug, Clone)]
pub struct EdgeDraw {
    pub edge_index: usize,
    pub from: usize,
    pub to: usize,
    pub first: SegId,
    pub last: SegId,
}

/// Segments sharing one bracket between two adjacent boundary lines.
#[derive(Debug, Clone)]
pub struct Channel {
    pub min: f32,
    pub max: f32,
    pub segs: Vec<SegId>,
}

pub type ChannelKey = (i64, i64);

fn channel_key(min: f32, max: f32) -> ChannelKey {
    ((min * 1000.0).round() as i64, (max * 1000.0).round() as i64)
}

/// Everything routed in one pass: the segment arena, per-edge chains and the
/// channels their segments fall into.
#[derive(Debug, Clone, Default)]
pub struct EdgeSegRecord {
    pub segs: SegArena,
    pub draws: Vec<EdgeDraw>,
    pub channels: BTreeMap<ChannelKey, Channel>,
}

impl EdgeSegRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Registers a finished chain and files its segments into channels.
    pub fn insert(&mut self, draw: EdgeDraw, maze: &Maze) {
        for id in self.segs.chain(draw.first) {
            let seg = self.segs.get(id);
            let Some((min, max)) = maze.channel_bracket(seg.axis, seg.is_hor) else {
                continue;
            };
            self.channels
                .entry(channel_key(min, max))
                .or_insert_with(|| Channel {
                    min,
                    max,
                    segs: Vec::new(),
                })
                .segs
                .push(id);
        }
        self.draws.push(draw);
    }

    pub fn draw_points(&self, draw: &EdgeDraw) -> Vec<(f32, f32)> {
        self.segs.to_points(draw.first)
    }

    /// Spreads overlapping parallel segments across their channels. Returns
    /// how many segments moved.
    pub fn resolve_overlaps(&mut self) -> usize {
        let Self { segs, channels, .. } = self;
        let mut moved = 0;
        for channel in channels.values() {
            moved += resolve_channel(segs, channel);
        }
        tracing::debug!(channels = channels.len(), moved, "resolved channel overlaps");
        moved
    }
}

fn resolve_channel(arena: &mut SegArena, channel: &Channel) -> usize {
    if channel.segs.len() < 2 {
        return 0;
    }
    let mut order = channel.segs.clone();
    order.sort_by(|a, b| {
        let sa = arena.get(*a);
        let sb = arena.get(*b);
        sa.is_hor
            .cmp(&sb.is_hor)
            .then_with(|| sa.axis.total_cmp(&sb.axis))
            .then_with(|| sa.start.total_cmp(&sb.start))
            .then_with(|| sa.end.total_cmp(&sb.end))
            .then_with(|| a.cmp(b))
    });

    let n = order.len();
    let mut succ: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut links: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if !arena.get(order[i]).overlaps(arena.get(order[j])) {
                continue;
            }
            let keep = crossings(arena, order[i], order[j]);
            let swap = crossings(arena, order[j], order[i]);
            let (low, high) = if swap < keep { (j, i) } else { (i, j) };
            succ[low].push(high);
            links[i].push(j);
            links[j].push(i);
        }
    }

    let rank = rank_by_depth(&succ);
    let mut moved = 0;
    for mut group in weak_groups(&links) {
        if group.len() < 2 {
            continue;
        }
        group.sort_by_key(|idx| (rank[*idx], *idx));
        let unit = (channel.max - channel.min) / (group.len() as f32 + 1.0);
        for (slot, idx) in group.iter().enumerate() {
            let id = order[*idx];
            if arena.get(id).can_not_move {
                continue;
            }
            arena.move_axis(id, channel.min + unit * (slot as f32 + 1.0));
            moved += 1;
        }
    }
    moved
}

/// Crossings between the two segments' neighbouring legs when `low` sits
/// just below `high`.
fn crossings(arena: &SegArena, low: SegId, high: SegId) -> usize {
    let mid = (arena.get(low).axis + arena.get(high).axis) / 2.0;
    let low_axis = mid - 1.0;
    let high_axis = mid + 1.0;
    legs_crossing(arena, low, low_axis, high, high_axis)
        + legs_crossing(arena, high, high_axis, low, low_axis)
}

fn legs_crossing(arena: &SegArena, id: SegId, axis: f32, other_id: SegId, other_axis: f32) -> usize {
    let seg = arena.get(id);
    let other = arena.get(other_id);
    let mut count = 0;
    for (neighbour, attached_at_end) in [(seg.pre, true), (seg.next, false)] {
        let Some(neighbour) = neighbour else {
            continue;
        };
        let leg = arena.get(neighbour);
        if leg.is_hor == seg.is_hor {
            continue;
        }
        if is_cross(leg.axis, axis, far_end(leg, attached_at_end), other_axis, other.start, other.end) {
            count += 1;
        }
    }
    count
}

fn far_end(leg: &EdgeSeg, attached_at_end: bool) -> f32 {
    if attached_at_end {
        leg.travel_start()
    } else {
        leg.travel_end()
    }
}

/// Whether a perpendicular leg at `run`, spanning from `from` to `to`, cuts a
/// segment lying on `axis` over `[start, end]`.
fn is_cross(run: f32, from: f32, to: f32, axis: f32, start: f32, end: f32) -> bool {
    if run <= start + EPS || run >= end - EPS {
        return false;
    }
    axis > from.min(to) && axis < from.max(to)
}

fn weak_groups(links: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut seen = vec![false; links.len()];
    let mut groups = Vec::new();
    for start in 0..links.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut group = vec![start];
        let mut cursor = 0;
        while cursor < group.len() {
            let node = group[cursor];
            cursor += 1;
            for &next in &links[node] {
                if !seen[next] {
                    seen[next] = true;
                    group.push(next);
                }
            }
        }
        groups.push(group);
    }
    groups
}

/// `rank = min(child.rank - 1)`, sinks at 0. Back edges of cycles are ignored.
fn rank_by_depth(succ: &[Vec<usize>]) -> Vec<i64> {
    let n = succ.len();
    let mut rank = vec![0i64; n];
    // 0 = unvisited, 1 = on stack, 2 = done
    let mut state = vec![0u8; n];
    for start in 0..n {
        if state[start] != 0 {
            continue;
        }
        state[start] = 1;
        let mut stack = vec![(start, 0usize)];
        while let Some(top) = stack.last_mut() {
            let (node, child) = *top;
            if child < succ[node].len() {
                top.1 += 1;
                let next = succ[node][child];
                if state[next] == 0 {
                    state[next] = 1;
                    stack.push((next, 0));
                }
                continue;
            }
            let mut value = 0;
            for &next in &succ[node] {
                if state[next] == 2 {
                    value = value.min(rank[next] - 1);
                }
            }
            rank[node] = value;
            state[node] = 2;
            stack.pop();
        }
    }
    rank
}
