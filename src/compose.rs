//! Operation composition: pre-transform, main operation, final write.
//!
//! A chain always runs in this order:
//!
//! ```text
//! source ─▶ [pre-transform] ─▶ main operation ─▶ [convert/write] ─▶ destination
//! ```
//!
//! Intermediate steps stream to [`Target::Default`], the tool's "default
//! output" sentinel (`miff:-`). Whether the final write step is needed is
//! decided by looking at the chain's last target, not by comparing formats:
//! a main operation that already writes a file (convert mode) ends the chain,
//! anything still streaming gets a write step to
//! [`path_for_format`]`(source, format)`. Without a format that write is
//! in place.

use crate::error::ProcessError;
use crate::geometry::{Operation, OperationDescriptor};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The sentinel a step writes to when its output feeds the next step.
pub const DEFAULT_OUTPUT: &str = "miff:-";

/// Where a step's output goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Stream to the next step ([`DEFAULT_OUTPUT`]).
    Default,
    Path(PathBuf),
}

impl Target {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Target::Default => None,
            Target::Path(path) => Some(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub operation: Operation,
    pub target: Target,
}

/// Source and final destination of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathPair {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Ordered, immutable list of steps over one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationChain {
    pub source: PathBuf,
    pub steps: Vec<Step>,
}

impl OperationChain {
    /// Target of the last step; an empty chain streams.
    pub fn final_target(&self) -> &Target {
        self.steps
            .last()
            .map(|step| &step.target)
            .unwrap_or(&Target::Default)
    }

    /// Source and destination, if the chain ends in a file.
    pub fn paths(&self) -> Option<PathPair> {
        self.final_target().path().map(|destination| PathPair {
            source: self.source.clone(),
            destination: destination.to_path_buf(),
        })
    }

    fn push(mut self, operation: Operation, target: Target) -> Self {
        self.steps.push(Step { operation, target });
        self
    }
}

/// Replace the extension of `path` with `format`, lower-cased.
///
/// `None` leaves the path alone. A path without an extension cannot be
/// rewritten and fails with [`ProcessError::Format`].
pub fn path_for_format(path: &Path, format: Option<&str>) -> Result<PathBuf, ProcessError> {
    let Some(format) = format else {
        return Ok(path.to_path_buf());
    };
    let format = format.trim_start_matches('.').to_lowercase();
    if path.extension().is_none() || format.is_empty() {
        return Err(ProcessError::Format {
            path: path.to_path_buf(),
            format,
        });
    }
    Ok(path.with_extension(format))
}

/// Build the chain for one call.
///
/// `format` only applies when the main operation leaves the chain
/// streaming; a main `Convert` has already chosen its destination.
pub fn compose(
    source: &Path,
    main: Operation,
    pre_transform: Option<OperationDescriptor>,
    format: Option<&str>,
) -> Result<OperationChain, ProcessError> {
    let mut chain = OperationChain {
        source: source.to_path_buf(),
        steps: Vec::new(),
    };

    if let Some(pre) = pre_transform {
        chain = chain.push(Operation::Transform(pre), Target::Default);
    }

    let main_target = match &main {
        Operation::Convert { format } => {
            Target::Path(path_for_format(source, format.as_deref())?)
        }
        Operation::Transform(_) => Target::Default,
    };
    chain = chain.push(main, main_target);

    if *chain.final_target() == Target::Default {
        let destination = path_for_format(source, format)?;
        chain = chain.push(
            Operation::Convert {
                format: format.map(str::to_lowercase),
            },
            Target::Path(destination),
        );
    }

    Ok(chain)
}
