use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ortho_edge_router::config::{LayoutConfig, SplineMode};
use ortho_edge_router::ir::Graph;
use ortho_edge_router::layout::generate_edges;
use std::hint::black_box;

/// `side x side` boxes wired to their right and lower neighbours, plus
/// `extra_edges` longer edges that have to detour around the rows between.
fn grid_graph(side: usize, extra_edges: usize) -> Graph {
    let mut graph = Graph::new();
    let id = |row: usize, col: usize| format!("n{row}_{col}");
    for row in 0..side {
        for col in 0..side {
            graph.add_node(&id(row, col), col as f32 * 120.0, row as f32 * 80.0, 60.0, 30.0);
        }
    }
    for row in 0..side {
        for col in 0..side {
            if col + 1 < side {
                graph.add_edge(&id(row, col), &id(row, col + 1));
            }
            if row + 1 < side {
                graph.add_edge(&id(row, col), &id(row + 1, col));
            }
        }
    }
    let mut count = 0usize;
    'outer: for row in 0..side {
        for col in 0..side.saturating_sub(2) {
            if count >= extra_edges {
                break 'outer;
            }
            let target = (row + 2).min(side - 1);
            graph.add_edge(&id(row, col), &id(target, col + 2));
            count += 1;
        }
    }
    graph
}

fn bench_ortho(c: &mut Criterion) {
    let mut group = c.benchmark_group("ortho");
    let config = LayoutConfig::default();
    for (side, extra) in [(3usize, 2usize), (6, 8), (10, 20)] {
        let graph = grid_graph(side, extra);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{side}x{side}+{extra}")),
            &graph,
            |b, graph| {
                b.iter(|| {
                    let layout = generate_edges(black_box(graph), &config).expect("layout failed");
                    black_box(layout.edges.len());
                });
            },
        );
    }
    group.finish();
}

fn bench_direct(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct");
    let config = LayoutConfig {
        splines: SplineMode::Curved,
        ..LayoutConfig::default()
    };
    let graph = grid_graph(10, 20);
    group.bench_function("10x10+20", |b| {
        b.iter(|| {
            let layout = generate_edges(black_box(&graph), &config).expect("layout failed");
            black_box(layout.edges.len());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_ortho, bench_direct);
criterion_main!(benches);
