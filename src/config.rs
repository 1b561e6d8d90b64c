use crate::theme::Theme;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LayoutConfig {
    pub node_spacing: f64,
    pub layer_spacing: f64,
    pub edge_node_spacing: f64,
    pub edge_edge_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 50.0,
            layer_spacing: 36.0,
            edge_node_spacing: 35.0,
            edge_edge_spacing: 25.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Node.js executable used to run elkjs.
    pub node: PathBuf,
    /// Directory exported as `NODE_PATH` so `require('elkjs')` resolves.
    pub node_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node: PathBuf::from("node"),
            node_path: default_node_path(),
            timeout: Duration::from_secs(30),
        }
    }
}

fn default_node_path() -> Option<PathBuf> {
    let local = std::env::current_dir().ok()?.join("node_modules");
    local.is_dir().then_some(local)
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub solver: SolverConfig,
    pub theme: Theme,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let spacings = [
            ("nodeSpacing", self.layout.node_spacing),
            ("layerSpacing", self.layout.layer_spacing),
            ("edgeNodeSpacing", self.layout.edge_node_spacing),
            ("edgeEdgeSpacing", self.layout.edge_edge_spacing),
        ];
        for (name, value) in spacings {
            if !(value.is_finite() && value > 0.0) {
                anyhow::bail!("{name} must be a positive number, got {value}");
            }
        }
        if self.solver.timeout.is_zero() {
            anyhow::bail!("solver timeout must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    start_fill: Option<String>,
    start_stroke: Option<String>,
    end_fill: Option<String>,
    end_stroke: Option<String>,
    process_fill: Option<String>,
    process_stroke: Option<String>,
    decision_fill: Option<String>,
    decision_stroke: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_spacing: Option<f64>,
    layer_spacing: Option<f64>,
    edge_node_spacing: Option<f64>,
    edge_edge_spacing: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SolverConfigFile {
    node: Option<PathBuf>,
    node_path: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    solver: Option<SolverConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed = parse_config_file(&contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = match theme_name {
            "textbook" | "default" => Theme::textbook(),
            "monochrome" | "mono" => Theme::monochrome(),
            other => anyhow::bail!("unknown theme `{other}`"),
        };
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.start_fill {
            theme.start_fill = v;
        }
        if let Some(v) = vars.start_stroke {
            theme.start_stroke = v;
        }
        if let Some(v) = vars.end_fill {
            theme.end_fill = v;
        }
        if let Some(v) = vars.end_stroke {
            theme.end_stroke = v;
        }
        if let Some(v) = vars.process_fill {
            theme.process_fill = v;
        }
        if let Some(v) = vars.process_stroke {
            theme.process_stroke = v;
        }
        if let Some(v) = vars.decision_fill {
            theme.decision_fill = v;
        }
        if let Some(v) = vars.decision_stroke {
            theme.decision_stroke = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.node_spacing {
            config.layout.node_spacing = v;
        }
        if let Some(v) = layout.layer_spacing {
            config.layout.layer_spacing = v;
        }
        if let Some(v) = layout.edge_node_spacing {
            config.layout.edge_node_spacing = v;
        }
        if let Some(v) = layout.edge_edge_spacing {
            config.layout.edge_edge_spacing = v;
        }
    }

    if let Some(solver) = parsed.solver {
        if let Some(v) = solver.node {
            config.solver.node = v;
        }
        if let Some(v) = solver.node_path {
            config.solver.node_path = Some(v);
        }
        if let Some(v) = solver.timeout_secs {
            config.solver.timeout = Duration::from_secs(v);
        }
    }

    config.validate()?;
    Ok(config)
}

fn parse_config_file(contents: &str) -> anyhow::Result<ConfigFile> {
    match serde_json::from_str(contents) {
        Ok(parsed) => Ok(parsed),
        // JSON5 allows comments and trailing commas in hand-edited files.
        Err(json_err) => json5::from_str(contents)
            .map_err(|_| anyhow::anyhow!("invalid config file: {json_err}")),
    }
}
