mod apply;
mod request;
mod solver;
pub(crate) mod types;

pub use apply::apply_layout;
pub use request::{BRANCH_PRIORITY, TRUNK_PRIORITY, build_layout_request, edge_routing, port_id};
pub use solver::{ElkJsSolver, LayoutSolver, ProcessOutput, run_with_timeout};
pub use types::*;

use crate::config::LayoutConfig;
use crate::error::SolverError;
use crate::ir::FlowGraph;
use tracing::info;

/// Builds the request, runs the solver once and writes the result back.
///
/// A solver failure leaves the graph untouched.
pub fn compute_layout(
    graph: &mut FlowGraph,
    config: &LayoutConfig,
    solver: &dyn LayoutSolver,
) -> Result<LayoutRequest, SolverError> {
    let request = build_layout_request(graph, config);
    let result = solver.solve(&request)?;
    apply_layout(graph, &result);
    info!(
        nodes = graph.node_count(),
        edges = graph.edges.len(),
        "layout applied"
    );
    Ok(request)
}
