#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, SolverConfig, load_config};
pub use error::{ExtractError, RenderError, SolverError};
pub use ir::{BranchLabel, FlowEdge, FlowGraph, FlowNode, NodeRole, PortSide};
pub use layout::{ElkJsSolver, LayoutSolver, apply_layout, build_layout_request, compute_layout};
pub use parser::parse_drawio;
pub use render::{render_drawio, write_output};
pub use theme::Theme;
