use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Start,
    End,
    Process,
    Decision,
}

/// Semantic branch label of an edge, derived from a Y/N affirmation rather
/// than the literal text on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchLabel {
    #[default]
    None,
    Yes,
    No,
}

impl BranchLabel {
    pub fn from_affirmation(text: &str) -> Option<Self> {
        let lowered = text.to_ascii_lowercase();
        match lowered.as_str() {
            "y" | "yes" => Some(Self::Yes),
            "n" | "no" => Some(Self::No),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    /// Short text drawn on the edge in the generated document.
    pub fn display(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Yes => "Y",
            Self::No => "N",
        }
    }
}

impl Serialize for BranchLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortSide {
    North,
    South,
    East,
    West,
}

impl PortSide {
    pub const ALL: [PortSide; 4] = [Self::North, Self::South, Self::East, Self::West];

    /// Single-letter suffix used in port ids (`<node>_S`).
    pub fn suffix(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::South => "S",
            Self::East => "E",
            Self::West => "W",
        }
    }

    pub fn from_suffix(token: &str) -> Option<Self> {
        match token {
            "N" | "NORTH" => Some(Self::North),
            "S" | "SOUTH" => Some(Self::South),
            "E" | "EAST" => Some(Self::East),
            "W" | "WEST" => Some(Self::West),
            _ => None,
        }
    }

    pub fn elk_name(self) -> &'static str {
        match self {
            Self::North => "NORTH",
            Self::South => "SOUTH",
            Self::East => "EAST",
            Self::West => "WEST",
        }
    }

    /// Relative anchor on the node boundary, as draw.io exit/entry fractions.
    pub fn anchor(self) -> (f64, f64) {
        match self {
            Self::North => (0.5, 0.0),
            Self::South => (0.5, 1.0),
            Self::East => (1.0, 0.5),
            Self::West => (0.0, 0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

pub const DEFAULT_NODE_WIDTH: f64 = 120.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub id: String,
    pub role: NodeRole,
    pub label: String,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, role: NodeRole, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            label: label.into(),
            width: DEFAULT_NODE_WIDTH,
            height: DEFAULT_NODE_HEIGHT,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: BranchLabel,
    pub source_side: PortSide,
    pub target_side: PortSide,
    pub points: Vec<Point>,
}

impl FlowEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: BranchLabel::None,
            source_side: PortSide::South,
            target_side: PortSide::North,
            points: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: BranchLabel) -> Self {
        self.label = label;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degree {
    pub incoming: usize,
    pub outgoing: usize,
}

/// Nodes are keyed by id for constant-time lookup; `order` keeps first
/// insertion order so output documents are stable across runs.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    nodes: HashMap<String, FlowNode>,
    order: Vec<String>,
    pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, node: FlowNode) {
        if !self.nodes.contains_key(&node.id) {
            self.order.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn push_edge(&mut self, edge: FlowEdge) {
        self.edges.push(edge);
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut FlowNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// In/out degree of every node over the current edge set. Edge endpoints
    /// that are not nodes are not counted.
    pub fn degrees(&self) -> HashMap<&str, Degree> {
        let mut degrees: HashMap<&str, Degree> = self
            .order
            .iter()
            .map(|id| (id.as_str(), Degree::default()))
            .collect();
        for edge in &self.edges {
            if let Some(degree) = degrees.get_mut(edge.source.as_str()) {
                degree.outgoing += 1;
            }
            if let Some(degree) = degrees.get_mut(edge.target.as_str()) {
                degree.incoming += 1;
            }
        }
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_but_keeps_slot() {
        let mut graph = FlowGraph::new();
        graph.insert_node(FlowNode::new("a", NodeRole::Process, "first"));
        graph.insert_node(FlowNode::new("b", NodeRole::Process, ""));
        graph.insert_node(FlowNode::new("a", NodeRole::Decision, "second"));

        let ids: Vec<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(graph.node_count(), 2);
        let a = graph.node("a").unwrap();
        assert_eq!(a.role, NodeRole::Decision);
        assert_eq!(a.label, "second");
    }

    #[test]
    fn degrees_ignore_unknown_endpoints() {
        let mut graph = FlowGraph::new();
        graph.insert_node(FlowNode::new("a", NodeRole::Process, ""));
        graph.insert_node(FlowNode::new("b", NodeRole::Process, ""));
        graph.push_edge(FlowEdge::new("e1", "a", "b"));
        graph.push_edge(FlowEdge::new("e2", "ghost", "b"));

        let degrees = graph.degrees();
        assert_eq!(degrees["a"], Degree { incoming: 0, outgoing: 1 });
        assert_eq!(degrees["b"], Degree { incoming: 2, outgoing: 0 });
        assert!(!degrees.contains_key("ghost"));
    }

    #[test]
    fn affirmation_is_case_insensitive() {
        assert_eq!(BranchLabel::from_affirmation("YES"), Some(BranchLabel::Yes));
        assert_eq!(BranchLabel::from_affirmation("n"), Some(BranchLabel::No));
        assert_eq!(BranchLabel::from_affirmation("maybe"), None);
        assert_eq!(BranchLabel::No.display(), "N");
    }

    #[test]
    fn port_suffix_round_trips() {
        for side in PortSide::ALL {
            assert_eq!(PortSide::from_suffix(side.suffix()), Some(side));
        }
        assert_eq!(PortSide::from_suffix("X"), None);
    }
}
