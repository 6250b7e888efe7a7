use crate::layout::Layout;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub clusters: Vec<ClusterDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Top, right, bottom, left.
    pub margin: [f32; 4],
    pub cluster: Option<String>,
    pub is_virtual: bool,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub curved: bool,
    pub head_start: bool,
    pub points: Vec<[f32; 2]>,
    pub label_anchor: Option<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct ClusterDump {
    pub id: String,
    pub parent: Option<String>,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                margin: [
                    node.margin.top,
                    node.margin.right,
                    node.margin.bottom,
                    node.margin.left,
                ],
                cluster: node.cluster.clone(),
                is_virtual: node.is_virtual,
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.clone(),
                to: edge.to.clone(),
                curved: edge.curved,
                head_start: edge.head_start,
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
                label_anchor: edge.label_anchor.map(|(x, y)| [x, y]),
            })
            .collect();

        let clusters = layout
            .clusters
            .iter()
            .map(|cluster| ClusterDump {
                id: cluster.id.clone(),
                parent: cluster.parent.clone(),
                depth: cluster.depth,
                x: cluster.rect.left,
                y: cluster.rect.top,
                width: cluster.rect.width(),
                height: cluster.rect.height(),
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
            clusters,
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout when `None`.
pub fn write_layout_dump(path: Option<&Path>, layout: &Layout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &dump)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::Graph;
    use crate::layout::generate_edges;

    #[test]
    fn dump_carries_edge_geometry() {
        let mut graph = Graph::new();
        graph.add_node("a", 0.0, 0.0, 2.0, 2.0);
        graph.add_node("b", 10.0, 0.0, 2.0, 2.0);
        graph.add_edge("a", "b");
        let layout = generate_edges(&graph, &LayoutConfig::default()).unwrap();
        let dump = LayoutDump::from_layout(&layout);
        assert_eq!(dump.nodes[1].x, 9.0);
        assert_eq!(dump.edges[0].points, vec![[1.0, 0.0], [9.0, 0.0]]);
        assert_eq!(dump.edges[0].label_anchor, Some([5.0, 0.0]));

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["edges"][0]["head_start"], serde_json::Value::Bool(false));
        assert_eq!(json["width"].as_f64(), Some(12.0));
    }
}
