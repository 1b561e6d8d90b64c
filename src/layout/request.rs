use std::collections::BTreeMap;

use tracing::debug;

use crate::config::LayoutConfig;
use crate::ir::{BranchLabel, FlowEdge, FlowGraph, FlowNode, NodeRole, PortSide};

use super::types::{
    EdgeProperties, EdgeRequest, LayoutRequest, NodeProperties, NodeRequest, PortProperties,
    PortRequest,
};

/// Trunk edges: kept straight and vertically aligned.
pub const TRUNK_PRIORITY: u32 = 10;
/// Side branches: the solver may route these around the trunk.
pub const BRANCH_PRIORITY: u32 = 1;

const FIXED_SIDE: &str = "FIXED_SIDE";

pub fn port_id(node_id: &str, side: PortSide) -> String {
    format!("{node_id}_{}", side.suffix())
}

/// Builds the ELK request for a flow graph.
///
/// Edges whose endpoints are not in the graph are left out of the request;
/// the graph itself keeps them.
pub fn build_layout_request(graph: &FlowGraph, config: &LayoutConfig) -> LayoutRequest {
    let children: Vec<NodeRequest> = graph.nodes().map(node_request).collect();

    let mut edges = Vec::with_capacity(graph.edges.len());
    for (idx, edge) in graph.edges.iter().enumerate() {
        let Some(source) = graph.node(&edge.source) else {
            debug!(edge = %edge.id, source = %edge.source, "skipping edge with unknown source");
            continue;
        };
        if !graph.contains_node(&edge.target) {
            debug!(edge = %edge.id, target = %edge.target, "skipping edge with unknown target");
            continue;
        }
        edges.push(edge_request(idx, edge, source));
    }

    debug!(nodes = children.len(), edges = edges.len(), "built layout request");
    LayoutRequest {
        id: "root".to_string(),
        layout_options: layout_options(config),
        children,
        edges,
    }
}

fn node_request(node: &FlowNode) -> NodeRequest {
    NodeRequest {
        id: node.id.clone(),
        width: node.width,
        height: node.height,
        ports: PortSide::ALL
            .iter()
            .map(|side| PortRequest {
                id: port_id(&node.id, *side),
                properties: PortProperties {
                    side: side.elk_name().to_string(),
                },
            })
            .collect(),
        properties: NodeProperties {
            port_constraints: FIXED_SIDE.to_string(),
        },
    }
}

/// Port and priority for an edge, from the role of its source node.
pub fn edge_routing(source_role: NodeRole, label: BranchLabel) -> (PortSide, u32) {
    match (source_role, label) {
        (NodeRole::Decision, BranchLabel::No) => (PortSide::East, BRANCH_PRIORITY),
        _ => (PortSide::South, TRUNK_PRIORITY),
    }
}

fn edge_request(idx: usize, edge: &FlowEdge, source: &FlowNode) -> EdgeRequest {
    let (source_side, priority) = edge_routing(source.role, edge.label);
    let id = if edge.id.is_empty() {
        format!("e{idx}")
    } else {
        edge.id.clone()
    };
    EdgeRequest {
        id,
        sources: vec![port_id(&edge.source, source_side)],
        targets: vec![port_id(&edge.target, PortSide::North)],
        properties: EdgeProperties { priority },
    }
}

fn layout_options(config: &LayoutConfig) -> BTreeMap<String, String> {
    [
        ("elk.algorithm", "layered".to_string()),
        ("elk.direction", "DOWN".to_string()),
        ("elk.edgeRouting", "ORTHOGONAL".to_string()),
        ("elk.layered.nodePlacement.strategy", "BRANDES_KOEPF".to_string()),
        ("elk.layered.crossingMinimization.strategy", "LAYER_SWEEP".to_string()),
        (
            "elk.layered.spacing.nodeNodeBetweenLayers",
            format_spacing(config.layer_spacing),
        ),
        ("elk.spacing.nodeNode", format_spacing(config.node_spacing)),
        ("elk.spacing.edgeNode", format_spacing(config.edge_node_spacing)),
        ("elk.spacing.edgeEdge", format_spacing(config.edge_edge_spacing)),
        ("elk.portConstraints", FIXED_SIDE.to_string()),
        ("elk.portAlignment.default", "CENTER".to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

/// ELK reads spacing options as strings; keep one decimal like `36.0`.
fn format_spacing(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
