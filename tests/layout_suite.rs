use std::path::Path;

use ortho_edge_router::layout::{EdgeLayout, Layout, Rect, path_bend_count};
use ortho_edge_router::{Graph, LayoutConfig, SplineMode, generate_edges};

const FIXTURES: [&str; 4] = ["basic.json5", "detour.json5", "fan.json5", "grid.json5"];

fn load_fixture(name: &str) -> Graph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    assert!(path.exists(), "fixture missing: {name}");
    let source = std::fs::read_to_string(&path).expect("fixture read failed");
    Graph::from_json5(&source).expect("fixture parse failed")
}

fn layout_fixture(name: &str, splines: SplineMode) -> (Graph, Layout) {
    let graph = load_fixture(name);
    let config = LayoutConfig {
        splines,
        ..LayoutConfig::default()
    };
    let layout = generate_edges(&graph, &config).expect("layout failed");
    (graph, layout)
}

fn edge_between<'a>(layout: &'a Layout, from: &str, to: &str) -> &'a EdgeLayout {
    layout
        .edges
        .iter()
        .find(|edge| edge.from == from && edge.to == to)
        .expect("edge missing")
}

fn crosses_interior(a: (f32, f32), b: (f32, f32), rect: &Rect) -> bool {
    let eps = 1e-3;
    let (lo_x, hi_x) = (a.0.min(b.0), a.0.max(b.0));
    let (lo_y, hi_y) = (a.1.min(b.1), a.1.max(b.1));
    lo_x < rect.right - eps && hi_x > rect.left + eps && lo_y < rect.bottom - eps && hi_y > rect.top + eps
}

#[test]
fn all_fixtures_route_in_every_mode() {
    for name in FIXTURES {
        for splines in [SplineMode::Ortho, SplineMode::Line, SplineMode::Curved] {
            let (graph, layout) = layout_fixture(name, splines);
            assert_eq!(layout.edges.len(), graph.edges.len(), "{name}");
            for (edge, drawn) in graph.edges.iter().zip(&layout.edges) {
                let touches_virtual = graph
                    .nodes
                    .iter()
                    .any(|node| node.is_virtual && (node.id == edge.from || node.id == edge.to));
                if edge.is_virtual || touches_virtual {
                    assert!(!drawn.is_routed(), "{name}: {} -> {} should stay empty", edge.from, edge.to);
                    continue;
                }
                assert!(drawn.is_routed(), "{name} {splines:?}: {} -> {} unrouted", edge.from, edge.to);
                assert!(drawn.label_anchor.is_some());
                assert!(
                    drawn.points.iter().all(|(x, y)| x.is_finite() && y.is_finite()),
                    "{name}: non-finite point"
                );
                if drawn.curved {
                    assert_eq!(drawn.points.len(), 4, "{name}: curve is not a cubic");
                }
            }
            assert!(layout.width > 0.0 && layout.height > 0.0);
        }
    }
}

#[test]
fn orthogonal_routes_stay_axis_aligned_and_clear_of_other_nodes() {
    for name in FIXTURES {
        let (graph, layout) = layout_fixture(name, SplineMode::Ortho);
        for (edge, drawn) in graph.edges.iter().zip(&layout.edges) {
            if edge.is_self_loop() || !drawn.is_routed() {
                continue;
            }
            assert!(!drawn.curved);
            for leg in drawn.points.windows(2) {
                let (a, b) = (leg[0], leg[1]);
                assert!(
                    (a.0 - b.0).abs() < 1e-3 || (a.1 - b.1).abs() < 1e-3,
                    "{name}: diagonal leg {a:?} -> {b:?}"
                );
            }
            for turn in drawn.points.windows(3) {
                let first = (turn[1].0 - turn[0].0, turn[1].1 - turn[0].1);
                let second = (turn[2].0 - turn[1].0, turn[2].1 - turn[1].1);
                assert!(
                    first.0 * second.0 + first.1 * second.1 >= -1e-3,
                    "{name}: route doubles back at {:?}",
                    turn[1]
                );
            }
            for node in &layout.nodes {
                if node.is_virtual || node.id == edge.from || node.id == edge.to {
                    continue;
                }
                let rect = node.visible_rect();
                for leg in drawn.points.windows(2) {
                    assert!(
                        !crosses_interior(leg[0], leg[1], &rect),
                        "{name}: {} -> {} crosses {}",
                        edge.from,
                        edge.to,
                        node.id
                    );
                }
            }
        }
    }
}

#[test]
fn neighbours_on_one_row_get_a_single_segment() {
    let (_, layout) = layout_fixture("basic.json5", SplineMode::Ortho);
    assert_eq!(layout.edges[0].points, vec![(1.0, 0.0), (9.0, 0.0)]);
}

#[test]
fn detour_edges_share_the_channel_symmetrically() {
    let (_, layout) = layout_fixture("detour.json5", SplineMode::Ortho);
    let mut lanes = Vec::new();
    for edge in &layout.edges {
        assert_eq!(path_bend_count(&edge.points), 2);
        let vertical = edge
            .points
            .windows(2)
            .find(|leg| (leg[0].0 - leg[1].0).abs() < 1e-3)
            .expect("detour has a vertical leg");
        lanes.push(vertical[0].0);
    }
    assert!((lanes[0] - lanes[1]).abs() > 1.0, "{lanes:?}");
    assert!((((lanes[0] + lanes[1]) / 2.0).abs() - 11.0).abs() < 1e-3, "{lanes:?}");
}

#[test]
fn parallel_fan_is_symmetric_about_the_chord() {
    let (_, layout) = layout_fixture("fan.json5", SplineMode::Line);
    let offsets: Vec<f32> = layout.edges.iter().map(|edge| edge.points[1].1).collect();
    assert!(offsets[1].abs() < 1e-4);
    assert!((offsets[0] + offsets[2]).abs() < 1e-4);
    assert!((offsets[0] - offsets[2]).abs() > 1.0);
    assert!(layout.edges.iter().all(|edge| edge.curved && !edge.head_start));
}

#[test]
fn grid_ports_are_honoured() {
    let (_, layout) = layout_fixture("grid.json5", SplineMode::Ortho);
    let down = edge_between(&layout, "n2", "n5");
    assert_eq!(down.points, vec![(100.0, 10.0), (100.0, 70.0)]);

    let around = edge_between(&layout, "n4", "n6");
    assert_eq!(around.points.first(), Some(&(20.0, 80.0)));
    assert_eq!(around.points.last(), Some(&(180.0, 80.0)));
    assert_eq!(path_bend_count(&around.points), 4);
}

#[test]
fn grid_guided_edge_keeps_its_waypoint() {
    let (_, layout) = layout_fixture("grid.json5", SplineMode::Ortho);
    let guided = edge_between(&layout, "n6", "n1");
    let on_route = guided.points.windows(2).any(|leg| {
        let (a, b) = (leg[0], leg[1]);
        let horizontal = (a.1 - 40.0).abs() < 1e-3 && (b.1 - 40.0).abs() < 1e-3;
        horizontal && a.0.min(b.0) <= 150.0 && a.0.max(b.0) >= 150.0
    });
    assert!(on_route, "{:?}", guided.points);
    assert_eq!(guided.label_anchor, Some((150.0, 40.0)));
}

#[test]
fn grid_self_loop_expands_its_node() {
    let (_, layout) = layout_fixture("grid.json5", SplineMode::Ortho);
    let node = layout.nodes.iter().find(|node| node.id == "n3").unwrap();
    assert_eq!(node.margin.right, 19.0);
    assert_eq!(node.margin.top, 9.0);
    let self_loop = edge_between(&layout, "n3", "n3");
    assert_eq!(self_loop.points.len(), 5);
    assert_eq!(self_loop.points[0], (220.0, 0.0));

    let (_, curved) = layout_fixture("grid.json5", SplineMode::Curved);
    let self_loop = edge_between(&curved, "n3", "n3");
    assert!(self_loop.curved);
    assert_eq!(self_loop.points.len(), 4);
}

#[test]
fn grid_clusters_keep_nesting_depth() {
    let (_, layout) = layout_fixture("grid.json5", SplineMode::Ortho);
    let depths: Vec<(String, usize)> = layout
        .clusters
        .iter()
        .map(|cluster| (cluster.id.clone(), cluster.depth))
        .collect();
    assert_eq!(depths, vec![("top".to_string(), 0), ("inner".to_string(), 1)]);
}

#[test]
fn layout_is_deterministic() {
    for name in FIXTURES {
        for splines in [SplineMode::Ortho, SplineMode::Curved] {
            let (_, first) = layout_fixture(name, splines);
            let (_, second) = layout_fixture(name, splines);
            for (left, right) in first.edges.iter().zip(&second.edges) {
                assert_eq!(left.points, right.points, "{name}");
                assert_eq!(left.label_anchor, right.label_anchor, "{name}");
            }
        }
    }
}
