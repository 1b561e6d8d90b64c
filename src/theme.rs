use crate::ir::NodeRole;

const BASE_STYLE: &str = "html=1;whiteSpace=wrap;";

/// Fill and stroke colours per flowchart role.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub start_fill: String,
    pub start_stroke: String,
    pub end_fill: String,
    pub end_stroke: String,
    pub process_fill: String,
    pub process_stroke: String,
    pub decision_fill: String,
    pub decision_stroke: String,
}

impl Theme {
    pub fn textbook() -> Self {
        Self {
            start_fill: "#d5e8d4".to_string(),
            start_stroke: "#82b366".to_string(),
            end_fill: "#f8cecc".to_string(),
            end_stroke: "#b85450".to_string(),
            process_fill: "#dae8fc".to_string(),
            process_stroke: "#6c8ebf".to_string(),
            decision_fill: "#fff2cc".to_string(),
            decision_stroke: "#d6b656".to_string(),
        }
    }

    pub fn monochrome() -> Self {
        Self {
            start_fill: "#ffffff".to_string(),
            start_stroke: "#000000".to_string(),
            end_fill: "#ffffff".to_string(),
            end_stroke: "#000000".to_string(),
            process_fill: "#ffffff".to_string(),
            process_stroke: "#000000".to_string(),
            decision_fill: "#ffffff".to_string(),
            decision_stroke: "#000000".to_string(),
        }
    }

    /// draw.io style string for a node of the given role.
    pub fn node_style(&self, role: NodeRole) -> String {
        let (shape, fill, stroke) = match role {
            NodeRole::Start => ("ellipse", &self.start_fill, &self.start_stroke),
            NodeRole::End => ("ellipse", &self.end_fill, &self.end_stroke),
            NodeRole::Process => ("rounded=0", &self.process_fill, &self.process_stroke),
            NodeRole::Decision => ("rhombus", &self.decision_fill, &self.decision_stroke),
        };
        format!("{BASE_STYLE}{shape};fillColor={fill};strokeColor={stroke};")
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::textbook()
    }
}
