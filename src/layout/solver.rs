use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::error::SolverError;

use super::types::{LayoutRequest, LayoutResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Anything that can turn a layout request into solved geometry.
pub trait LayoutSolver {
    fn solve(&self, request: &LayoutRequest) -> Result<LayoutResult, SolverError>;
}

/// Runs elkjs under Node.js in a child process.
#[derive(Debug, Clone)]
pub struct ElkJsSolver {
    pub node: PathBuf,
    pub node_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl ElkJsSolver {
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            node: config.node.clone(),
            node_path: config.node_path.clone(),
            timeout: config.timeout,
        }
    }

    /// Checks that the Node.js runtime starts, returning its version string.
    pub fn check_runtime(&self) -> Result<String, SolverError> {
        let mut command = Command::new(&self.node);
        command.arg("-v");
        let output = run_with_timeout(command, self.timeout)?;
        if !output.status.success() {
            return Err(SolverError::Failed {
                status: output.status.to_string(),
                stderr: output.stderr,
            });
        }
        Ok(output.stdout.trim().to_string())
    }

    fn script(request: &LayoutRequest) -> Result<String, SolverError> {
        let graph = serde_json::to_string(request)?;
        Ok(format!(
            "const ELK = require('elkjs');\n\
             const elk = new ELK();\n\
             const graph = {graph};\n\
             elk.layout(graph)\n  \
               .then(r => process.stdout.write(JSON.stringify(r)))\n  \
               .catch(e => {{ console.error(e); process.exit(1); }});\n"
        ))
    }
}

impl LayoutSolver for ElkJsSolver {
    fn solve(&self, request: &LayoutRequest) -> Result<LayoutResult, SolverError> {
        let mut script = tempfile::Builder::new()
            .prefix("elk-layout-")
            .suffix(".js")
            .tempfile()
            .map_err(SolverError::Script)?;
        script
            .write_all(Self::script(request)?.as_bytes())
            .and_then(|_| script.flush())
            .map_err(SolverError::Script)?;

        let mut command = Command::new(&self.node);
        command.arg(script.path());
        if let Some(node_path) = &self.node_path {
            command.env("NODE_PATH", node_path);
        }

        info!(
            nodes = request.children.len(),
            edges = request.edges.len(),
            "running ELK layout"
        );
        let output = run_with_timeout(command, self.timeout)?;
        if !output.status.success() {
            return Err(SolverError::Failed {
                status: output.status.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        let result: LayoutResult = serde_json::from_str(&output.stdout)?;
        debug!(
            nodes = result.children.len(),
            edges = result.edges.len(),
            "ELK layout finished"
        );
        Ok(result)
    }
}

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a command to completion, killing it once `timeout` has elapsed.
///
/// Both pipes are drained on their own threads so a chatty child cannot
/// block on a full pipe while we poll.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<ProcessOutput, SolverError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SolverError::Spawn { program, source })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_with_deadline(&mut child, timeout)?;
    Ok(ProcessOutput {
        status,
        stdout: join_drain(stdout),
        stderr: join_drain(stderr),
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<ExitStatus, SolverError> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SolverError::Timeout(timeout));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => return Err(SolverError::Wait(err)),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_drain(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
