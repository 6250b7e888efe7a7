pub mod channel;
mod error;
pub mod maze;
pub mod parallel;
pub mod pathfinder;
pub mod ports;
mod routing;
pub mod segment;
pub mod self_loop;
pub(crate) mod types;

pub use error::LayoutError;
pub use routing::{CurveClip, PathClip, PathKind, StraightClip, path_bend_count, path_length};
pub use types::*;

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::config::{LayoutConfig, SplineMode};
use crate::ir::{Edge, Graph};
use channel::{EdgeDraw, EdgeSegRecord};
use maze::{CellId, Maze};
use parallel::symmetry_parallel_line;
use pathfinder::{PathContent, RouteRequest};
use ports::{RoutePort, compass_point, resolve_ortho_port};
use routing::*;
use self_loop::layout_self_loops;

/// Cluster parent chains longer than this are rejected.
const MAX_CLUSTER_DEPTH: usize = 64;

/// Computes edge geometry for a graph whose nodes are already placed.
///
/// Self-loops are drawn around their node in every mode. In
/// [`SplineMode::Ortho`] the remaining edges are routed through the maze in
/// node order and their overlapping legs spread across shared channels; the
/// other modes draw straight chords and fan parallel edges out as Bezier
/// curves. Edges that cannot be drawn are logged and keep an empty point
/// list.
pub fn generate_edges(graph: &Graph, config: &LayoutConfig) -> Result<Layout, LayoutError> {
    config.validate()?;
    validate_graph(graph)?;

    let clusters = cluster_layouts(graph)?;
    let mut nodes = node_layouts(graph);
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let mut edges: Vec<EdgeLayout> = graph
        .edges
        .iter()
        .map(|edge| EdgeLayout {
            from: edge.from.clone(),
            to: edge.to.clone(),
            ..EdgeLayout::default()
        })
        .collect();

    place_self_loops(graph, &mut nodes, &index, config, &mut edges);
    let endpoints = routable_endpoints(graph, &nodes, &index);
    match config.splines {
        SplineMode::Ortho => route_orthogonal(graph, &nodes, &clusters, &endpoints, config, &mut edges)?,
        SplineMode::Line | SplineMode::Curved => route_direct(graph, &nodes, &endpoints, config, &mut edges),
    }

    for (edge, layout) in graph.edges.iter().zip(edges.iter_mut()) {
        if edge.is_self_loop() || !layout.is_routed() {
            continue;
        }
        let kind = if layout.curved {
            PathKind::Curve
        } else {
            PathKind::Straight
        };
        layout.label_anchor = edge_label_anchor(&layout.points, kind, &edge.guides);
    }

    let (width, height) = layout_extent(&nodes, &clusters, &edges);
    Ok(Layout {
        nodes,
        edges,
        clusters,
        width,
        height,
    })
}

// ── Validation ──────────────────────────────────────────────────────

fn invalid(id: &str, reason: &str) -> LayoutError {
    LayoutError::InvalidGeometry {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn check_box(id: &str, values: [f32; 4]) -> Result<(), LayoutError> {
    if values.iter().any(|value| !value.is_finite()) {
        return Err(invalid(id, "position and size must be finite"));
    }
    if values[2] < 0.0 || values[3] < 0.0 {
        return Err(invalid(id, "size must not be negative"));
    }
    Ok(())
}

fn validate_graph(graph: &Graph) -> Result<(), LayoutError> {
    let mut node_ids = HashSet::new();
    for node in &graph.nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(invalid(&node.id, "duplicate node id"));
        }
        check_box(&node.id, [node.x, node.y, node.width, node.height])?;
        let margin = &node.margin;
        let sides = [margin.top, margin.right, margin.bottom, margin.left];
        if sides.iter().any(|side| !side.is_finite() || *side < 0.0) {
            return Err(invalid(&node.id, "margins must be finite and not negative"));
        }
    }

    let mut cluster_ids = HashSet::new();
    for cluster in &graph.clusters {
        if !cluster_ids.insert(cluster.id.as_str()) {
            return Err(invalid(&cluster.id, "duplicate cluster id"));
        }
        check_box(&cluster.id, [cluster.x, cluster.y, cluster.width, cluster.height])?;
    }
    for cluster in &graph.clusters {
        if let Some(parent) = &cluster.parent {
            if !cluster_ids.contains(parent.as_str()) {
                return Err(LayoutError::UnknownCluster(parent.clone()));
            }
        }
    }
    for node in &graph.nodes {
        if let Some(cluster) = &node.cluster {
            if !cluster_ids.contains(cluster.as_str()) {
                return Err(LayoutError::UnknownCluster(cluster.clone()));
            }
        }
    }

    for edge in &graph.edges {
        for id in [&edge.from, &edge.to] {
            if !node_ids.contains(id.as_str()) {
                return Err(LayoutError::UnknownNode(id.clone()));
            }
        }
        let name = format!("{}->{}", edge.from, edge.to);
        if edge.guides.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(invalid(&name, "guide points must be finite"));
        }
        if let Some(label) = edge.label {
            if !label.width.is_finite() || !label.height.is_finite() || label.width < 0.0 || label.height < 0.0 {
                return Err(invalid(&name, "label size must be finite and not negative"));
            }
        }
    }
    Ok(())
}

// ── Geometry setup ──────────────────────────────────────────────────

fn node_layouts(graph: &Graph) -> Vec<NodeLayout> {
    graph
        .nodes
        .iter()
        .map(|node| NodeLayout {
            id: node.id.clone(),
            x: node.x - node.width / 2.0,
            y: node.y - node.height / 2.0,
            width: node.width,
            height: node.height,
            margin: node.margin,
            cluster: node.cluster.clone(),
            is_virtual: node.is_virtual,
        })
        .collect()
}

fn cluster_layouts(graph: &Graph) -> Result<Vec<ClusterLayout>, LayoutError> {
    let parents: HashMap<&str, Option<&str>> = graph
        .clusters
        .iter()
        .map(|cluster| (cluster.id.as_str(), cluster.parent.as_deref()))
        .collect();
    graph
        .clusters
        .iter()
        .map(|cluster| {
            let mut depth = 0;
            let mut cursor = cluster.parent.as_deref();
            while let Some(parent) = cursor {
                depth += 1;
                if depth > MAX_CLUSTER_DEPTH {
                    return Err(LayoutError::NestingTooDeep {
                        id: cluster.id.clone(),
                        limit: MAX_CLUSTER_DEPTH,
                    });
                }
                cursor = parents.get(parent).copied().flatten();
            }
            Ok(ClusterLayout {
                id: cluster.id.clone(),
                rect: Rect {
                    left: cluster.x,
                    top: cluster.y,
                    right: cluster.x + cluster.width,
                    bottom: cluster.y + cluster.height,
                },
                parent: cluster.parent.clone(),
                depth,
            })
        })
        .collect()
}

fn layout_extent(nodes: &[NodeLayout], clusters: &[ClusterLayout], edges: &[EdgeLayout]) -> (f32, f32) {
    let node_rects = nodes
        .iter()
        .filter(|node| !node.is_virtual)
        .map(NodeLayout::obstacle_rect);
    let cluster_rects = clusters.iter().map(|cluster| cluster.rect);
    let edge_points = edges.iter().flat_map(|edge| edge.points.iter()).map(|&(x, y)| Rect {
        left: x,
        top: y,
        right: x,
        bottom: y,
    });
    node_rects
        .chain(cluster_rects)
        .chain(edge_points)
        .reduce(|acc, rect| acc.union(&rect))
        .map(|rect| (rect.width(), rect.height()))
        .unwrap_or((0.0, 0.0))
}

// ── Self-loops ──────────────────────────────────────────────────────

fn place_self_loops(
    graph: &Graph,
    nodes: &mut [NodeLayout],
    index: &HashMap<&str, usize>,
    config: &LayoutConfig,
    edges: &mut [EdgeLayout],
) {
    let mut loops: Vec<Vec<(usize, f32)>> = vec![Vec::new(); nodes.len()];
    for (idx, edge) in graph.edges.iter().enumerate() {
        if !edge.is_self_loop() || edge.is_virtual {
            continue;
        }
        let Some(&node_idx) = index.get(edge.from.as_str()) else {
            continue;
        };
        if nodes[node_idx].is_virtual {
            warn!(node = %edge.from, "self-loop on a virtual node left undrawn");
            continue;
        }
        let label_width = edge.label.map(|label| label.width).unwrap_or(0.0);
        loops[node_idx].push((idx, label_width));
    }

    let curved = config.splines == SplineMode::Curved;
    for (node_idx, node_loops) in loops.iter().enumerate() {
        if node_loops.is_empty() {
            continue;
        }
        let (expander, placed) =
            layout_self_loops(&nodes[node_idx], node_loops, config.self_loop_unit(), curved);
        expander.apply(&mut nodes[node_idx].margin);
        for self_loop in placed {
            let edge = &mut edges[self_loop.edge_index];
            edge.points = self_loop.points;
            edge.curved = self_loop.curved;
            edge.label_anchor = Some(self_loop.label_anchor);
        }
    }
}

// ── Edge selection ──────────────────────────────────────────────────

/// Node indices of every edge this pass draws between two distinct real
/// nodes. Virtual edges and self-loops map to `None`.
fn routable_endpoints(
    graph: &Graph,
    nodes: &[NodeLayout],
    index: &HashMap<&str, usize>,
) -> Vec<Option<(usize, usize)>> {
    graph
        .edges
        .iter()
        .map(|edge| {
            if edge.is_self_loop() || edge.is_virtual {
                return None;
            }
            let from = *index.get(edge.from.as_str())?;
            let to = *index.get(edge.to.as_str())?;
            if nodes[from].is_virtual || nodes[to].is_virtual {
                warn!(from = %edge.from, to = %edge.to, "edge touches a virtual node; left unrouted");
                return None;
            }
            Some((from, to))
        })
        .collect()
}

// ── Orthogonal routing ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct PlannedEdge {
    from: usize,
    to: usize,
    tail: RoutePort,
    head: RoutePort,
}

fn route_orthogonal(
    graph: &Graph,
    nodes: &[NodeLayout],
    clusters: &[ClusterLayout],
    endpoints: &[Option<(usize, usize)>],
    config: &LayoutConfig,
    edges: &mut [EdgeLayout],
) -> Result<(), LayoutError> {
    let mut plans: Vec<Option<PlannedEdge>> = vec![None; graph.edges.len()];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut side_ports = Vec::new();
    let mut guides = Vec::new();
    for (idx, edge) in graph.edges.iter().enumerate() {
        let Some((from, to)) = endpoints[idx] else {
            continue;
        };
        let tail = resolve_ortho_port(&nodes[from], edge.tail_port);
        let head = resolve_ortho_port(&nodes[to], edge.head_port);
        for (node, port) in [(from, tail), (to, head)] {
            if !port.is_center() {
                side_ports.push((node, port));
            }
        }
        guides.extend(edge.guides.iter().copied());
        plans[idx] = Some(PlannedEdge { from, to, tail, head });
        outgoing[from].push(idx);
    }

    let cluster_rects: Vec<Rect> = clusters.iter().map(|cluster| cluster.rect).collect();
    let maze = Maze::build(nodes, &cluster_rects, &side_ports, &guides, config.node_sep);
    debug!(vertices = maze.vertex_count(), "built routing maze");

    let mut content = PathContent::new();
    let mut record = EdgeSegRecord::new();
    for &idx in outgoing.iter().flatten() {
        let Some(plan) = plans[idx] else {
            continue;
        };
        let edge = &graph.edges[idx];
        let (Some(source), Some(target)) = (maze.node_cell(plan.from), maze.node_cell(plan.to)) else {
            warn!(from = %edge.from, to = %edge.to, "edge endpoint has no maze cell; left unrouted");
            continue;
        };
        let guide_cells: Option<Vec<CellId>> = edge
            .guides
            .iter()
            .map(|point| maze.guide_cell(*point))
            .collect();
        let Some(guide_cells) = guide_cells else {
            warn!(from = %edge.from, to = %edge.to, "guide point missing from the maze; left unrouted");
            continue;
        };
        let request = RouteRequest {
            source,
            target,
            tail_port: plan.tail,
            head_port: plan.head,
            guides: &guide_cells,
        };
        let found = pathfinder::route(&maze, &mut content, &request, &config.ortho)?;
        content.clear();
        let Some(path) = found else {
            warn!(from = %edge.from, to = %edge.to, "no orthogonal route; left unrouted");
            continue;
        };
        let Some((first, last)) = record.segs.build_chain(&path.points) else {
            warn!(from = %edge.from, to = %edge.to, "route collapsed to a point; left unrouted");
            continue;
        };
        let last = record.segs.adjust_port_seg(
            first,
            last,
            &plan.tail,
            &plan.head,
            config.ortho.axis_tolerance,
        );
        for &guide in &edge.guides {
            record.segs.pin_through(first, guide);
        }
        debug!(
            from = %edge.from,
            to = %edge.to,
            bends = path.bends,
            len = path.len,
            expansions = path.expansions,
            "routed edge"
        );
        record.insert(
            EdgeDraw {
                edge_index: idx,
                from: plan.from,
                to: plan.to,
                first,
                last,
            },
            &maze,
        );
    }

    record.resolve_overlaps();

    for draw in &record.draws {
        let Some(plan) = plans[draw.edge_index] else {
            continue;
        };
        let mut points = record.draw_points(draw);
        if plan.tail.is_center() {
            StraightClip.clip_tail(&mut points, &nodes[draw.from].visible_rect());
        }
        if plan.head.is_center() {
            StraightClip.clip_head(&mut points, &nodes[draw.to].visible_rect());
        }
        let points = compress_path(&points);
        if tracing::enabled!(tracing::Level::DEBUG) {
            let others: Vec<Rect> = nodes
                .iter()
                .enumerate()
                .filter(|(idx, node)| !node.is_virtual && *idx != draw.from && *idx != draw.to)
                .map(|(_, node)| node.visible_rect())
                .collect();
            let crossings = path_obstacle_intersections(&points, &others);
            if crossings > 0 {
                debug!(edge = draw.edge_index, crossings, "route crosses node boxes");
            }
        }
        edges[draw.edge_index].points = points;
    }
    Ok(())
}

// ── Straight and curved edges ───────────────────────────────────────

fn end_point(node: &NodeLayout, port: Option<crate::ir::Compass>) -> (f32, f32) {
    port.and_then(|compass| compass_point(node, compass))
        .unwrap_or_else(|| node.center())
}

fn chord_points(from: (f32, f32), to: (f32, f32), curved: bool) -> Vec<(f32, f32)> {
    if !curved {
        return vec![from, to];
    }
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    vec![
        from,
        (from.0 + dx / 3.0, from.1 + dy / 3.0),
        (from.0 + dx * 2.0 / 3.0, from.1 + dy * 2.0 / 3.0),
        to,
    ]
}

fn route_direct(
    graph: &Graph,
    nodes: &[NodeLayout],
    endpoints: &[Option<(usize, usize)>],
    config: &LayoutConfig,
    edges: &mut [EdgeLayout],
) {
    let curved = config.splines == SplineMode::Curved;
    let groups = group_parallel_edges(&graph.edges, |idx, edge: &Edge| {
        edge.guides.is_empty() && endpoints[idx].is_some()
    });

    for ((first_id, _), members) in groups {
        if let [idx] = members.as_slice() {
            let idx = *idx;
            let Some((from, to)) = endpoints[idx] else {
                continue;
            };
            let edge = &graph.edges[idx];
            let kind = if curved {
                PathKind::Curve
            } else {
                PathKind::Straight
            };
            let mut points = chord_points(
                end_point(&nodes[from], edge.tail_port),
                end_point(&nodes[to], edge.head_port),
                curved,
            );
            let clip = kind.clipper();
            clip.clip_tail(&mut points, &nodes[from].visible_rect());
            clip.clip_head(&mut points, &nodes[to].visible_rect());
            edges[idx].points = points;
            edges[idx].curved = curved;
            continue;
        }

        let Some((a, b)) = endpoints[members[0]].map(|(from, to)| {
            if graph.edges[members[0]].from == first_id {
                (from, to)
            } else {
                (to, from)
            }
        }) else {
            continue;
        };
        let curves = symmetry_parallel_line(
            nodes[a].center(),
            nodes[b].center(),
            members.len(),
            config.parallel_spacing(),
        );
        let clip = PathKind::Curve.clipper();
        for (&idx, curve) in members.iter().zip(curves) {
            let mut points = curve.to_vec();
            clip.clip_tail(&mut points, &nodes[a].visible_rect());
            clip.clip_head(&mut points, &nodes[b].visible_rect());
            let layout = &mut edges[idx];
            layout.points = points;
            layout.curved = true;
            layout.head_start = graph.edges[idx].from != first_id;
        }
    }

    for (idx, edge) in graph.edges.iter().enumerate() {
        if edge.guides.is_empty() {
            continue;
        }
        let Some((from, to)) = endpoints[idx] else {
            continue;
        };
        let mut points = Vec::with_capacity(edge.guides.len() + 2);
        points.push(end_point(&nodes[from], edge.tail_port));
        points.extend(edge.guides.iter().copied());
        points.push(end_point(&nodes[to], edge.head_port));
        StraightClip.clip_tail(&mut points, &nodes[from].visible_rect());
        StraightClip.clip_head(&mut points, &nodes[to].visible_rect());
        edges[idx].points = points;
    }
}
