#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{LayoutConfig, SplineMode, load_config};
pub use ir::Graph;
pub use layout::{Layout, LayoutError, generate_edges};
