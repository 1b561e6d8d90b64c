use crate::ir::{BranchLabel, FlowGraph, NodeRole, PortSide};
use crate::layout::LayoutRequest;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct GraphDump {
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub role: NodeRole,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: BranchLabel,
    pub source_side: PortSide,
    pub target_side: PortSide,
    pub points: Vec<[f64; 2]>,
}

impl GraphDump {
    pub fn from_graph(graph: &FlowGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| NodeDump {
                id: node.id.clone(),
                role: node.role,
                label: node.label.clone(),
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                label: edge.label,
                source_side: edge.source_side,
                target_side: edge.target_side,
                points: edge.points.iter().map(|p| [p.x, p.y]).collect(),
            })
            .collect();

        GraphDump { nodes, edges }
    }
}

pub fn write_graph_dump(path: &Path, graph: &FlowGraph) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &GraphDump::from_graph(graph))?;
    Ok(())
}

pub fn write_request_dump(path: &Path, request: &LayoutRequest) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, request)?;
    Ok(())
}
