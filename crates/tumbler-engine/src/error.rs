use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Shader stage kind, carried in compile diagnostics.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors produced by the rendering pipeline.
///
/// Compile and link failures are unrecoverable for the affected program;
/// construction aborts and the diagnostic log is surfaced to the host.
/// `MissingAttribute` aborts a single frame and indicates a shader/layout
/// pairing defect, so callers log it on every occurrence.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{stage} shader failed to compile: {log}")]
    CompileFailed { stage: StageKind, log: String },

    #[error("shader program failed to link: {log}")]
    LinkFailed { log: String },

    #[error("required vertex attribute `{name}` is absent from the active shader")]
    MissingAttribute { name: &'static str },

    #[error("failed to decode texture image '{}': {log}", path.display())]
    TextureDecodeFailed { path: PathBuf, log: String },
}
