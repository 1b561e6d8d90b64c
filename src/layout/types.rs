use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ir::Point;

/// ELK JSON graph handed to the layout solver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub id: String,
    pub layout_options: BTreeMap<String, String>,
    pub children: Vec<NodeRequest>,
    pub edges: Vec<EdgeRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeRequest {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub ports: Vec<PortRequest>,
    pub properties: NodeProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeProperties {
    #[serde(rename = "portConstraints")]
    pub port_constraints: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortRequest {
    pub id: String,
    pub properties: PortProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortProperties {
    #[serde(rename = "port.side")]
    pub side: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeRequest {
    pub id: String,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
    pub properties: EdgeProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeProperties {
    /// Higher values keep the edge short and straight; low values allow detours.
    #[serde(rename = "org.eclipse.elk.layered.priority.direction")]
    pub priority: u32,
}

/// Solved graph as returned by ELK. Only the fields the applier reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutResult {
    #[serde(default)]
    pub children: Vec<NodeResult>,
    #[serde(default)]
    pub edges: Vec<EdgeResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeResult {
    pub id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeResult {
    pub id: String,
    #[serde(default)]
    pub sections: Vec<EdgeSection>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSection {
    pub start_point: Point,
    pub end_point: Point,
    #[serde(default)]
    pub bend_points: Vec<Point>,
}
