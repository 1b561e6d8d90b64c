use std::collections::HashMap;

use crate::ir::{FlowGraph, PortSide};

use super::types::{EdgeResult, LayoutResult};

/// Writes solved coordinates and routes into the graph.
///
/// Ids the graph does not know are ignored, and graph entries missing from
/// the result keep their current geometry.
pub fn apply_layout(graph: &mut FlowGraph, result: &LayoutResult) {
    for child in &result.children {
        if let Some(node) = graph.node_mut(&child.id) {
            node.x = child.x;
            node.y = child.y;
        }
    }

    let routes: HashMap<&str, &EdgeResult> = result
        .edges
        .iter()
        .map(|edge| (edge.id.as_str(), edge))
        .collect();

    for (idx, edge) in graph.edges.iter_mut().enumerate() {
        let found = if edge.id.is_empty() {
            routes.get(format!("e{idx}").as_str())
        } else {
            routes.get(edge.id.as_str())
        };
        let Some(edge_result) = found else {
            continue;
        };
        edge.points = route_points(edge_result);
        edge.source_side = resolved_side(&edge_result.sources).unwrap_or(PortSide::South);
        edge.target_side = resolved_side(&edge_result.targets).unwrap_or(PortSide::North);
    }
}

fn route_points(edge: &EdgeResult) -> Vec<crate::ir::Point> {
    let mut points = Vec::new();
    for section in &edge.sections {
        points.push(section.start_point);
        points.extend(section.bend_points.iter().copied());
        points.push(section.end_point);
    }
    points
}

/// Side encoded after the last `_` of the first port id (`B_E` -> East).
fn resolved_side(ports: &[String]) -> Option<PortSide> {
    let port = ports.first()?;
    let (_, suffix) = port.rsplit_once('_')?;
    PortSide::from_suffix(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FlowEdge, FlowNode, NodeRole, Point};

    fn graph() -> FlowGraph {
        let mut graph = FlowGraph::new();
        graph.insert_node(FlowNode::new("dec_1", NodeRole::Decision, "?"));
        graph.insert_node(FlowNode::new("b", NodeRole::End, ""));
        graph.insert_node(FlowNode::new("c", NodeRole::End, ""));
        graph.push_edge(FlowEdge::new("e1", "dec_1", "b"));
        graph.push_edge(FlowEdge::new("e2", "dec_1", "c"));
        graph
    }

    fn result(json: &str) -> LayoutResult {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn applies_positions_routes_and_ports() {
        let mut graph = graph();
        let solved = result(
            r#"{
                "id": "root",
                "children": [
                    {"id": "dec_1", "x": 12.0, "y": 24.5, "width": 120, "height": 60},
                    {"id": "b", "x": 12, "y": 120}
                ],
                "edges": [{
                    "id": "e1",
                    "sources": ["dec_1_E"],
                    "targets": ["b_W"],
                    "sections": [
                        {"startPoint": {"x": 132, "y": 54}, "bendPoints": [{"x": 160, "y": 54}], "endPoint": {"x": 160, "y": 100}},
                        {"startPoint": {"x": 160, "y": 100}, "endPoint": {"x": 12, "y": 150}}
                    ]
                }]
            }"#,
        );
        apply_layout(&mut graph, &solved);

        let dec = graph.node("dec_1").unwrap();
        assert_eq!((dec.x, dec.y), (12.0, 24.5));
        assert_eq!(graph.node("b").unwrap().y, 120.0);

        let e1 = &graph.edges[0];
        assert_eq!(
            e1.points,
            vec![
                Point { x: 132.0, y: 54.0 },
                Point { x: 160.0, y: 54.0 },
                Point { x: 160.0, y: 100.0 },
                Point { x: 160.0, y: 100.0 },
                Point { x: 12.0, y: 150.0 },
            ]
        );
        assert_eq!(e1.source_side, PortSide::East);
        assert_eq!(e1.target_side, PortSide::West);
    }

    #[test]
    fn unnamed_edges_match_their_request_index() {
        let mut graph = graph();
        graph.edges[0].id.clear();
        let solved = result(
            r#"{"edges": [{"id": "e0", "sources": ["dec_1_E"], "targets": ["b_W"]}]}"#,
        );
        apply_layout(&mut graph, &solved);

        assert_eq!(graph.edges[0].source_side, PortSide::East);
        assert_eq!(graph.edges[0].target_side, PortSide::West);
        assert_eq!(graph.edges[1].source_side, PortSide::South);
    }

    #[test]
    fn partial_results_leave_defaults() {
        let mut graph = graph();
        let solved = result(
            r#"{"children": [{"id": "unknown", "x": 5, "y": 5}],
                "edges": [{"id": "nope", "sections": []}, {"id": "e2", "sources": ["c_?"]}]}"#,
        );
        apply_layout(&mut graph, &solved);

        let c = graph.node("c").unwrap();
        assert_eq!((c.x, c.y), (0.0, 0.0));
        assert!(graph.edges[0].points.is_empty());
        assert_eq!(graph.edges[1].source_side, PortSide::South);
        assert_eq!(graph.edges[1].target_side, PortSide::North);
    }
}
