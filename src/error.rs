use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failures reading a diagram document into a flow graph.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("XML parsing error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("invalid draw.io document: no mxGraphModel element found")]
    MissingGraphModel,
}

/// Failures from the external layout solver.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to prepare solver script: {0}")]
    Script(#[source] io::Error),

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("layout solver timed out after {0:?}")]
    Timeout(Duration),

    #[error("layout solver exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("malformed layout response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("failed waiting for layout solver: {0}")]
    Wait(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("XML writing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("generated document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
