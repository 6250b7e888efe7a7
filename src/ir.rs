use serde::{Deserialize, Serialize};

/// Compass point naming where an edge attaches to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compass {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
    C,
}

impl Compass {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "n" => Some(Self::N),
            "ne" => Some(Self::NE),
            "e" => Some(Self::E),
            "se" => Some(Self::SE),
            "s" => Some(Self::S),
            "sw" => Some(Self::SW),
            "w" => Some(Self::W),
            "nw" => Some(Self::NW),
            "c" | "_" => Some(Self::C),
            _ => None,
        }
    }

    /// Offset of the compass point from the node center, in half-extents.
    pub fn ratios(self) -> (f32, f32) {
        match self {
            Self::N => (0.0, -1.0),
            Self::NE => (1.0, -1.0),
            Self::E => (1.0, 0.0),
            Self::SE => (1.0, 1.0),
            Self::S => (0.0, 1.0),
            Self::SW => (-1.0, 1.0),
            Self::W => (-1.0, 0.0),
            Self::NW => (-1.0, -1.0),
            Self::C => (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub margin: Margins,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub tail_port: Option<Compass>,
    #[serde(default)]
    pub head_port: Option<Compass>,
    #[serde(default)]
    pub label: Option<LabelSize>,
    /// Ordered waypoints the route has to pass through.
    #[serde(default)]
    pub guides: Vec<(f32, f32)>,
    #[serde(default)]
    pub is_virtual: bool,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json5(source: &str) -> anyhow::Result<Self> {
        Ok(json5::from_str(source)?)
    }

    pub fn add_node(&mut self, id: &str, x: f32, y: f32, width: f32, height: f32) -> &mut Node {
        self.nodes.push(Node {
            id: id.to_string(),
            x,
            y,
            width,
            height,
            margin: Margins::default(),
            cluster: None,
            is_virtual: false,
        });
        let last = self.nodes.len() - 1;
        &mut self.nodes[last]
    }

    pub fn add_edge(&mut self, from: &str, to: &str) -> &mut Edge {
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            tail_port: None,
            head_port: None,
            label: None,
            guides: Vec::new(),
            is_virtual: false,
        });
        let last = self.edges.len() - 1;
        &mut self.edges[last]
    }

    pub fn add_cluster(&mut self, id: &str, x: f32, y: f32, width: f32, height: f32) -> &mut Cluster {
        self.clusters.push(Cluster {
            id: id.to_string(),
            x,
            y,
            width,
            height,
            parent: None,
        });
        let last = self.clusters.len() - 1;
        &mut self.clusters[last]
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json5_graph() {
        let source = r#"{
            nodes: [
                { id: "a", x: 0, y: 0, width: 2, height: 2 },
                { id: "b", x: 10, y: 0, width: 2, height: 2, margin: { left: 1 } },
            ],
            edges: [{ from: "a", to: "b", headPort: "w", guides: [[5, 0]] }],
        }"#;
        let graph = Graph::from_json5(source).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1].margin.left, 1.0);
        assert_eq!(graph.edges[0].head_port, Some(Compass::W));
        assert_eq!(graph.edges[0].guides, vec![(5.0, 0.0)]);
        assert!(graph.clusters.is_empty());
    }

    #[test]
    fn compass_tokens() {
        assert_eq!(Compass::from_token("NE"), Some(Compass::NE));
        assert_eq!(Compass::from_token("_"), Some(Compass::C));
        assert_eq!(Compass::from_token("up"), None);
    }
}
