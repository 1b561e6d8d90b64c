use crate::config::{Config, load_config};
use crate::layout::{ElkJsSolver, compute_layout};
use crate::layout_dump::{write_graph_dump, write_request_dump};
use crate::parser::parse_drawio;
use crate::render::{render_drawio, write_output};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "flowchart-textbook",
    version,
    about = "Re-lay out a draw.io flowchart with a straight main trunk and side branches"
)]
pub struct Args {
    /// Input draw.io file
    pub input: PathBuf,

    /// Output file. Defaults to `<input-stem>_textbook.<ext>` next to the input.
    pub output: Option<PathBuf>,

    /// Config JSON file (layout spacing, solver, theme colours)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Horizontal spacing between nodes in the same layer
    #[arg(long = "node-spacing")]
    pub node_spacing: Option<f64>,

    /// Vertical spacing between layers
    #[arg(long = "layer-spacing")]
    pub layer_spacing: Option<f64>,

    /// Node.js executable used to run elkjs
    #[arg(long = "node")]
    pub node: Option<PathBuf>,

    /// Directory containing `node_modules/elkjs`, exported as NODE_PATH
    #[arg(long = "node-path")]
    pub node_path: Option<PathBuf>,

    /// Seconds to wait for the layout solver
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Write the ELK layout request as JSON
    #[arg(long = "dump-request")]
    pub dump_request: Option<PathBuf>,

    /// Write the laid-out flow graph as JSON
    #[arg(long = "dump-graph")]
    pub dump_graph: Option<PathBuf>,

    /// Log debug details
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    let solver = ElkJsSolver::from_config(&config.solver);
    let version = solver
        .check_runtime()
        .context("Node.js is required to run the ELK layout engine")?;
    info!(%version, "found Node.js");

    let input = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let mut graph = parse_drawio(&input)
        .with_context(|| format!("extracting flow graph from {}", args.input.display()))?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edges.len(),
        "parsed flowchart"
    );

    let request = compute_layout(&mut graph, &config.layout, &solver).context("layout failed")?;
    if let Some(path) = &args.dump_request {
        write_request_dump(path, &request)
            .with_context(|| format!("writing layout request to {}", path.display()))?;
    }

    let xml = render_drawio(&graph, &config.theme).context("generating draw.io document")?;
    write_output(&xml, &output)?;
    if let Some(path) = &args.dump_graph {
        write_graph_dump(path, &graph)
            .with_context(|| format!("writing graph dump to {}", path.display()))?;
    }

    info!(output = %output.display(), "done");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(v) = args.node_spacing {
        config.layout.node_spacing = v;
    }
    if let Some(v) = args.layer_spacing {
        config.layout.layer_spacing = v;
    }
    if let Some(v) = &args.node {
        config.solver.node = v.clone();
    }
    if let Some(v) = &args.node_path {
        config.solver.node_path = Some(v.clone());
    }
    if let Some(v) = args.timeout {
        config.solver.timeout = Duration::from_secs(v);
    }
}

/// `<dir>/<stem>_textbook.<ext>`, using `drawio` when the input has no extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("diagram");
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("drawio");
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{stem}_textbook.{ext}"))
}
