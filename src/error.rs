//! Error taxonomy for a processor call.
//!
//! Every failure is tagged with the [`Stage`] it came from, so callers can
//! tell a bad configuration apart from a tool that fell over halfway through.
//! Nothing here is retried; errors bubble straight out of
//! [`Processor::call`](crate::processor::Processor::call).

use crate::command::RunError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    /// Unknown processor mode, wrong argument count, unparseable gravity.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A format conversion was requested for a path with no extension.
    #[error("Cannot convert {} to '{format}': path has no extension", path.display())]
    Format { path: PathBuf, format: String },
    /// In a batch, the destination is shared with another input's
    /// destination or is another input's source.
    #[error("{} is also written or read by another input of the batch", destination.display())]
    Conflict { destination: PathBuf },
    /// The runner failed: non-zero exit, missing binary, decode/encode error.
    #[error("Execution failed: {0}")]
    Execution(#[from] RunError),
    /// The runner reported success but the destination cannot be opened.
    #[error("Cannot open output {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// The pipeline stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Configuration(_) => Stage::Resolve,
            Self::Format { .. } | Self::Conflict { .. } => Stage::Compose,
            Self::Execution(_) | Self::Io { .. } => Stage::Execute,
        }
    }
}

/// Pipeline stages of a single call: resolve → compose → execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Compose,
    Execute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolve => "resolve",
            Stage::Compose => "compose",
            Stage::Execute => "execute",
        })
    }
}
