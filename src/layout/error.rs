use thiserror::Error;

/// Precondition and invariant failures. Unroutable edges are not errors; they
/// are logged and left without points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("unknown cluster `{0}`")]
    UnknownCluster(String),
    #[error("invalid geometry for `{id}`: {reason}")]
    InvalidGeometry { id: String, reason: String },
    #[error("cluster `{id}` is nested deeper than {limit} levels")]
    NestingTooDeep { id: String, limit: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("maze has no cell {0}")]
    UnknownCell(usize),
    #[error("maze has no vertex {0}")]
    UnknownVertex(usize),
}
