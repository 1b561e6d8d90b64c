use crate::error::RenderError;
use crate::ir::{FlowEdge, FlowGraph, FlowNode};
use crate::theme::Theme;
use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

const EDGE_STYLE: &str =
    "edgeStyle=orthogonalEdgeStyle;rounded=0;orthogonalLoop=1;jettySize=auto;html=1;";

/// Serializes a laid-out graph as an indented draw.io document.
pub fn render_drawio(graph: &FlowGraph, theme: &Theme) -> Result<String, RenderError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut mxfile = BytesStart::new("mxfile");
    mxfile.push_attribute(("host", "flowchart-textbook"));
    mxfile.push_attribute(("version", env!("CARGO_PKG_VERSION")));
    writer.write_event(Event::Start(mxfile))?;

    let mut diagram = BytesStart::new("diagram");
    diagram.push_attribute(("name", "Flowchart"));
    writer.write_event(Event::Start(diagram))?;

    let mut model = BytesStart::new("mxGraphModel");
    model.push_attribute(("dx", "1200"));
    model.push_attribute(("dy", "1200"));
    model.push_attribute(("grid", "1"));
    model.push_attribute(("gridSize", "10"));
    writer.write_event(Event::Start(model))?;
    writer.write_event(Event::Start(BytesStart::new("root")))?;

    let mut layer_root = BytesStart::new("mxCell");
    layer_root.push_attribute(("id", "0"));
    writer.write_event(Event::Empty(layer_root))?;
    let mut layer = BytesStart::new("mxCell");
    layer.push_attribute(("id", "1"));
    layer.push_attribute(("parent", "0"));
    writer.write_event(Event::Empty(layer))?;

    for node in graph.nodes() {
        write_node(&mut writer, node, theme)?;
    }
    for edge in &graph.edges {
        write_edge(&mut writer, edge)?;
    }

    writer.write_event(Event::End(BytesEnd::new("root")))?;
    writer.write_event(Event::End(BytesEnd::new("mxGraphModel")))?;
    writer.write_event(Event::End(BytesEnd::new("diagram")))?;
    writer.write_event(Event::End(BytesEnd::new("mxfile")))?;

    let mut xml = String::from_utf8(writer.into_inner())?;
    xml.push('\n');
    Ok(xml)
}

fn write_node<W: Write>(
    writer: &mut Writer<W>,
    node: &FlowNode,
    theme: &Theme,
) -> Result<(), RenderError> {
    let style = theme.node_style(node.role);
    let mut cell = BytesStart::new("mxCell");
    push_text(&mut cell, "id", &node.id);
    push_text(&mut cell, "value", &node.label);
    cell.push_attribute(("style", style.as_str()));
    cell.push_attribute(("vertex", "1"));
    cell.push_attribute(("parent", "1"));
    writer.write_event(Event::Start(cell))?;

    let (x, y) = (fmt_num(node.x), fmt_num(node.y));
    let (width, height) = (fmt_num(node.width), fmt_num(node.height));
    let mut geometry = BytesStart::new("mxGeometry");
    geometry.push_attribute(("x", x.as_str()));
    geometry.push_attribute(("y", y.as_str()));
    geometry.push_attribute(("width", width.as_str()));
    geometry.push_attribute(("height", height.as_str()));
    geometry.push_attribute(("as", "geometry"));
    writer.write_event(Event::Empty(geometry))?;

    writer.write_event(Event::End(BytesEnd::new("mxCell")))?;
    Ok(())
}

fn write_edge<W: Write>(writer: &mut Writer<W>, edge: &FlowEdge) -> Result<(), RenderError> {
    let style = edge_style(edge);
    let mut cell = BytesStart::new("mxCell");
    push_text(&mut cell, "id", &edge.id);
    cell.push_attribute(("value", edge.label.display()));
    cell.push_attribute(("style", style.as_str()));
    cell.push_attribute(("edge", "1"));
    cell.push_attribute(("parent", "1"));
    push_text(&mut cell, "source", &edge.source);
    push_text(&mut cell, "target", &edge.target);
    writer.write_event(Event::Start(cell))?;

    let mut geometry = BytesStart::new("mxGeometry");
    geometry.push_attribute(("relative", "1"));
    geometry.push_attribute(("as", "geometry"));
    if edge.points.is_empty() {
        writer.write_event(Event::Empty(geometry))?;
    } else {
        writer.write_event(Event::Start(geometry))?;
        let mut array = BytesStart::new("Array");
        array.push_attribute(("as", "points"));
        writer.write_event(Event::Start(array))?;
        for point in &edge.points {
            let (x, y) = (fmt_num(point.x), fmt_num(point.y));
            let mut mx_point = BytesStart::new("mxPoint");
            mx_point.push_attribute(("x", x.as_str()));
            mx_point.push_attribute(("y", y.as_str()));
            writer.write_event(Event::Empty(mx_point))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Array")))?;
        writer.write_event(Event::End(BytesEnd::new("mxGeometry")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("mxCell")))?;
    Ok(())
}

/// Pushes document text as an attribute. Line breaks and tabs become
/// character references; written raw they would read back as spaces.
fn push_text<'a>(start: &mut BytesStart<'a>, key: &'a str, value: &str) {
    let escaped = escape(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;");
    start.push_attribute(Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escaped.into_bytes()),
    });
}

/// Orthogonal routing pinned to the exit/entry sides chosen by the layout.
pub fn edge_style(edge: &FlowEdge) -> String {
    let (exit_x, exit_y) = edge.source_side.anchor();
    let (entry_x, entry_y) = edge.target_side.anchor();
    format!(
        "{EDGE_STYLE}exitX={exit_x};exitY={exit_y};entryX={entry_x};entryY={entry_y};entryPerimeter=0;"
    )
}

fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Writes the document next to its destination and renames it into place,
/// so an interrupted run never leaves a truncated file behind.
///
/// An existing destination keeps its permissions; a new file gets the same
/// umask-derived mode a plain write would give it.
pub fn write_output(xml: &str, output: &Path) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let existing = std::fs::metadata(output).ok().map(|meta| meta.permissions());

    let mut builder = tempfile::Builder::new();
    builder.prefix(".flowchart-textbook").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut file = builder
        .tempfile_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    file.write_all(xml.as_bytes())?;
    file.flush()?;
    if let Some(permissions) = existing {
        file.as_file()
            .set_permissions(permissions)
            .with_context(|| format!("copying permissions of {}", output.display()))?;
    }
    file.persist(output)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BranchLabel, NodeRole, Point, PortSide};
    use crate::parser::parse_drawio;
    use pretty_assertions::assert_eq;

    fn laid_out() -> FlowGraph {
        let mut graph = FlowGraph::new();
        let mut start = FlowNode::new("A", NodeRole::Start, "Begin");
        start.x = 40.0;
        start.y = 12.5;
        graph.insert_node(start);
        graph.insert_node(FlowNode::new("B", NodeRole::Decision, "Proceed & check?"));
        graph.insert_node(FlowNode::new("C", NodeRole::Process, "Work"));
        graph.insert_node(FlowNode::new("D", NodeRole::End, "Stop"));
        graph.push_edge(FlowEdge::new("ab", "A", "B"));
        graph.push_edge(FlowEdge::new("bc", "B", "C").with_label(BranchLabel::Yes));
        let mut no = FlowEdge::new("bd", "B", "D").with_label(BranchLabel::No);
        no.source_side = PortSide::East;
        no.target_side = PortSide::West;
        no.points = vec![Point { x: 160.0, y: 90.0 }, Point { x: 210.5, y: 90.0 }];
        graph.push_edge(no);
        graph.push_edge(FlowEdge::new("cd", "C", "D"));
        graph
    }

    #[test]
    fn writes_reserved_roots_then_nodes_and_edges() {
        let xml = render_drawio(&laid_out(), &Theme::textbook()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let ids: Vec<&str> = doc
            .descendants()
            .filter(|n| n.has_tag_name("mxCell"))
            .filter_map(|n| n.attribute("id"))
            .collect();
        assert_eq!(ids, vec!["0", "1", "A", "B", "C", "D", "ab", "bc", "bd", "cd"]);
        assert!(xml.contains("\n  <diagram name=\"Flowchart\">"));
    }

    #[test]
    fn node_cells_carry_role_style_and_geometry() {
        let xml = render_drawio(&laid_out(), &Theme::textbook()).unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let cell = |id: &str| {
            doc.descendants()
                .find(|n| n.has_tag_name("mxCell") && n.attribute("id") == Some(id))
                .unwrap()
        };
        let a = cell("A");
        assert!(a.attribute("style").unwrap().contains("ellipse;fillColor=#d5e8d4"));
        let geo = a.first_element_child().unwrap();
        assert_eq!(geo.attribute("x"), Some("40.0"));
        assert_eq!(geo.attribute("y"), Some("12.5"));
        assert_eq!(geo.attribute("width"), Some("120.0"));
        assert_eq!(cell("B").attribute("value"), Some("Proceed & check?"));
        assert!(cell("B").attribute("style").unwrap().contains("rhombus"));
    }

    #[test]
    fn edge_cells_encode_anchors_labels_and_points() {
        let xml = render_drawio(&laid_out(), &Theme::textbook()).unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let edge = |id: &str| {
            doc.descendants()
                .find(|n| n.has_tag_name("mxCell") && n.attribute("id") == Some(id))
                .unwrap()
        };
        let bc = edge("bc");
        assert_eq!(bc.attribute("value"), Some("Y"));
        assert!(bc.attribute("style").unwrap().contains("exitX=0.5;exitY=1;entryX=0.5;entryY=0;"));
        assert_eq!(bc.descendants().filter(|n| n.has_tag_name("mxPoint")).count(), 0);

        let bd = edge("bd");
        assert_eq!(bd.attribute("value"), Some("N"));
        assert_eq!(bd.attribute("source"), Some("B"));
        assert!(bd.attribute("style").unwrap().contains("exitX=1;exitY=0.5;entryX=0;entryY=0.5;"));
        let points: Vec<(&str, &str)> = bd
            .descendants()
            .filter(|n| n.has_tag_name("mxPoint"))
            .map(|n| (n.attribute("x").unwrap(), n.attribute("y").unwrap()))
            .collect();
        assert_eq!(points, vec![("160.0", "90.0"), ("210.5", "90.0")]);
    }

    #[test]
    fn round_trips_ids_edges_and_roles() {
        let graph = laid_out();
        let xml = render_drawio(&graph, &Theme::monochrome()).unwrap();
        let back = parse_drawio(&xml).unwrap();

        let ids = |g: &FlowGraph| {
            let mut ids: Vec<(String, NodeRole)> =
                g.nodes().map(|n| (n.id.clone(), n.role)).collect();
            ids.sort_by(|a, b| a.0.cmp(&b.0));
            ids
        };
        let pairs = |g: &FlowGraph| {
            let mut pairs: Vec<(String, String)> = g
                .edges
                .iter()
                .map(|e| (e.source.clone(), e.target.clone()))
                .collect();
            pairs.sort();
            pairs
        };
        assert_eq!(ids(&back), ids(&graph));
        assert_eq!(pairs(&back), pairs(&graph));
        let labels: Vec<BranchLabel> = back.edges.iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec![
                BranchLabel::None,
                BranchLabel::Yes,
                BranchLabel::No,
                BranchLabel::None
            ]
        );
    }

    #[test]
    fn write_output_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chart_textbook.drawio");
        std::fs::write(&out, "old").unwrap();
        write_output("<mxfile/>\n", &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "<mxfile/>\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn new_output_gets_the_usual_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.drawio");
        std::fs::write(&plain, "x").unwrap();
        let out = dir.path().join("chart_textbook.drawio");
        write_output("<mxfile/>\n", &out).unwrap();

        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&out), mode(&plain));
    }

    #[cfg(unix)]
    #[test]
    fn replaced_output_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chart_textbook.drawio");
        std::fs::write(&out, "old").unwrap();
        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o640)).unwrap();
        write_output("<mxfile/>\n", &out).unwrap();

        let mode = std::fs::metadata(&out).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn multi_line_labels_survive_a_rewrite() {
        let input = r#"<mxfile><diagram><mxGraphModel><root>
            <mxCell id="0"/><mxCell id="1" parent="0"/>
            <mxCell id="a" value="Line one&#xa;Line two&#9;end" style="rounded=0;" vertex="1" parent="1"/>
            <mxCell id="b" value="Done" style="ellipse;" vertex="1" parent="1"/>
            <mxCell id="ab" edge="1" parent="1" source="a" target="b"/>
        </root></mxGraphModel></diagram></mxfile>"#;
        let graph = parse_drawio(input).unwrap();
        assert_eq!(graph.node("a").unwrap().label, "Line one\nLine two\tend");

        let xml = render_drawio(&graph, &Theme::textbook()).unwrap();
        assert!(xml.contains(r#"value="Line one&#10;Line two&#9;end""#));
        let back = parse_drawio(&xml).unwrap();
        assert_eq!(back.node("a").unwrap().label, "Line one\nLine two\tend");
        assert_eq!(back.node("b").unwrap().label, "Done");
    }
}
