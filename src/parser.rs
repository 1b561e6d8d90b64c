use crate::error::ExtractError;
use crate::ir::{BranchLabel, DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH, FlowEdge, FlowGraph, FlowNode, NodeRole};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

const RESERVED_IDS: [&str; 2] = ["0", "1"];

#[derive(Debug, Clone, Copy, Default)]
struct Geometry<'a> {
    width: Option<&'a str>,
    height: Option<&'a str>,
}

/// One `mxCell`, with wrapper attributes (`UserObject`/`object`) folded in.
#[derive(Debug, Clone)]
struct Cell<'a> {
    id: &'a str,
    parent: Option<&'a str>,
    edge_marker: bool,
    source: Option<&'a str>,
    target: Option<&'a str>,
    style: &'a str,
    value: &'a str,
    connectable: bool,
    geometry: Option<Geometry<'a>>,
}

impl Cell<'_> {
    fn is_edge(&self) -> bool {
        self.edge_marker || (self.source.is_some() && self.target.is_some())
    }

    fn is_edge_label(&self) -> bool {
        contains_ignore_case(self.style, "edgelabel")
    }
}

/// Id index and parent index over every cell, built before classification.
struct CellIndex<'a> {
    cells: Vec<Cell<'a>>,
    by_id: HashMap<&'a str, usize>,
    children: HashMap<&'a str, Vec<usize>>,
}

impl<'a> CellIndex<'a> {
    fn build(cells: Vec<Cell<'a>>) -> Self {
        let mut by_id = HashMap::new();
        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, cell) in cells.iter().enumerate() {
            by_id.entry(cell.id).or_insert(idx);
            if let Some(parent) = cell.parent {
                children.entry(parent).or_default().push(idx);
            }
        }
        Self {
            cells,
            by_id,
            children,
        }
    }

    fn get(&self, id: &str) -> Option<&Cell<'a>> {
        self.by_id.get(id).map(|idx| &self.cells[*idx])
    }

    /// Cells in document order, skipping later duplicates of an id.
    fn unique(&self) -> impl Iterator<Item = &Cell<'a>> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(idx, cell)| self.by_id.get(cell.id) == Some(idx))
            .map(|(_, cell)| cell)
    }

    fn children_of(&self, id: &str) -> impl Iterator<Item = &Cell<'a>> {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .map(|idx| &self.cells[*idx])
    }

    fn is_node(&self, cell: &Cell<'_>) -> bool {
        if RESERVED_IDS.contains(&cell.id) || cell.geometry.is_none() || cell.is_edge() {
            return false;
        }
        if cell.is_edge_label() || !cell.connectable {
            return false;
        }
        if let Some(parent) = cell.parent {
            if !RESERVED_IDS.contains(&parent) {
                if let Some(parent_cell) = self.get(parent) {
                    if parent_cell.is_edge() {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Reads a draw.io document and recovers the flow graph it describes.
///
/// Edges whose endpoints are not flow nodes are dropped and repeated
/// (source, target) pairs keep only their first occurrence. Roles come from
/// the shape style first and are then overridden by connectivity.
pub fn parse_drawio(input: &str) -> Result<FlowGraph, ExtractError> {
    let doc = roxmltree::Document::parse(input)?;
    let mut models = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "mxGraphModel");
    let model = models.next().ok_or(ExtractError::MissingGraphModel)?;
    let extra_pages = models.count();
    if extra_pages > 0 {
        warn!(extra_pages, "document has several pages; only the first is laid out");
    }

    let index = CellIndex::build(collect_cells(model));
    let mut graph = FlowGraph::new();

    for cell in index.unique() {
        if !cell.is_edge() && index.is_node(cell) {
            graph.insert_node(node_from_cell(cell));
        }
    }

    let mut connected: HashSet<(&str, &str)> = HashSet::new();
    for cell in index.unique().filter(|cell| cell.is_edge()) {
        let (Some(source), Some(target)) = (cell.source, cell.target) else {
            continue;
        };
        if !graph.contains_node(source) || !graph.contains_node(target) {
            debug!(edge = cell.id, source, target, "dropping edge with dangling endpoint");
            continue;
        }
        if !connected.insert((source, target)) {
            debug!(edge = cell.id, source, target, "dropping duplicate edge");
            continue;
        }
        graph.push_edge(FlowEdge::new(cell.id, source, target));
    }

    for edge in &mut graph.edges {
        edge.label = edge_label(&index, &edge.id);
    }

    refine_roles(&mut graph);
    debug!(
        nodes = graph.node_count(),
        edges = graph.edges.len(),
        "extracted flow graph"
    );
    Ok(graph)
}

fn collect_cells<'a>(model: Node<'a, '_>) -> Vec<Cell<'a>> {
    model
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "mxCell")
        .filter_map(cell_from_node)
        .collect()
}

fn cell_from_node<'a>(node: Node<'a, '_>) -> Option<Cell<'a>> {
    let wrapper = node
        .parent_element()
        .filter(|p| matches!(p.tag_name().name(), "UserObject" | "object"));
    let id = node
        .attribute("id")
        .or_else(|| wrapper.and_then(|w| w.attribute("id")))?;
    let value = node
        .attribute("value")
        .or_else(|| wrapper.and_then(|w| w.attribute("label")))
        .unwrap_or("");
    let geometry = node
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == "mxGeometry")
        .map(|geo| Geometry {
            width: geo.attribute("width"),
            height: geo.attribute("height"),
        });
    Some(Cell {
        id,
        parent: node.attribute("parent"),
        edge_marker: node.attribute("edge") == Some("1"),
        source: node.attribute("source").filter(|s| !s.is_empty()),
        target: node.attribute("target").filter(|s| !s.is_empty()),
        style: node.attribute("style").unwrap_or(""),
        value,
        connectable: node.attribute("connectable") != Some("0"),
        geometry,
    })
}

fn node_from_cell(cell: &Cell<'_>) -> FlowNode {
    let geometry = cell.geometry.unwrap_or_default();
    let width = parse_dimension(geometry.width, DEFAULT_NODE_WIDTH);
    let height = parse_dimension(geometry.height, DEFAULT_NODE_HEIGHT);
    FlowNode::new(cell.id, role_from_style(cell.style), cell.value).with_size(width, height)
}

fn parse_dimension(raw: Option<&str>, fallback: f64) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(fallback)
}

/// Ellipses start out as START; terminals are told apart later by degree.
fn role_from_style(style: &str) -> NodeRole {
    if contains_ignore_case(style, "rhombus") || contains_ignore_case(style, "diamond") {
        NodeRole::Decision
    } else if contains_ignore_case(style, "ellipse") {
        NodeRole::Start
    } else {
        NodeRole::Process
    }
}

/// Free text on the edge itself ("maybe") does not hide a yes/no floating label.
fn edge_label(index: &CellIndex<'_>, edge_id: &str) -> BranchLabel {
    if let Some(label) = index
        .get(edge_id)
        .and_then(|cell| BranchLabel::from_affirmation(&normalize_label(cell.value)))
    {
        return label;
    }
    index
        .children_of(edge_id)
        .find(|child| child.is_edge_label())
        .and_then(|child| BranchLabel::from_affirmation(&normalize_label(child.value)))
        .unwrap_or_default()
}

/// Labels saved with `html=1` carry markup and non-breaking spaces.
fn normalize_label(value: &str) -> String {
    let stripped = HTML_TAG_RE.replace_all(value, "");
    stripped
        .replace("&nbsp;", " ")
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

fn refine_roles(graph: &mut FlowGraph) {
    let updates: Vec<(String, NodeRole)> = graph
        .degrees()
        .into_iter()
        .filter_map(|(id, degree)| {
            if degree.incoming == 0 && degree.outgoing > 0 {
                Some((id.to_string(), NodeRole::Start))
            } else if degree.outgoing == 0 && degree.incoming > 0 {
                Some((id.to_string(), NodeRole::End))
            } else {
                None
            }
        })
        .collect();
    for (id, role) in updates {
        if let Some(node) = graph.node_mut(&id) {
            node.role = role;
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}
