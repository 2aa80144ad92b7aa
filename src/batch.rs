//! Batch runs: expand inputs, then fan one processor out over many files.
//!
//! Files run in parallel on the rayon pool, so no two of them may touch the
//! same file. [`collect_inputs`] drops duplicate sources (after
//! canonicalising). [`run_batch`] then plans every input before anything
//! runs and refuses, with [`ProcessError::Conflict`], each input whose
//! destination is shared with another input or is another input's source:
//! `a.jpg` and `a.png` under `--format webp`, or `convert png` over a
//! directory already holding `a.png`.

use crate::command::CommandRunner;
use crate::command::native::supported_extensions;
use crate::error::ProcessError;
use crate::processor::{CallOptions, Processor};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Source path and its outcome: the written destination or the error.
pub type BatchResult = (PathBuf, Result<PathBuf, ProcessError>);

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            supported_extensions().contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Expand directories into the images they contain and drop duplicates.
///
/// Files named explicitly are kept whatever their extension; directories
/// contribute only files with a supported image extension, in name order.
pub fn collect_inputs(paths: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut inputs = Vec::new();

    for path in paths {
        let candidates: Vec<PathBuf> = if fs::metadata(path)?.is_dir() {
            walkdir::WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| is_supported_image(p))
                .collect()
        } else {
            vec![path.clone()]
        };

        for candidate in candidates {
            if seen.insert(fs::canonicalize(&candidate)?) {
                inputs.push(candidate);
            } else {
                tracing::debug!(path = %candidate.display(), "skipping duplicate input");
            }
        }
    }
    Ok(inputs)
}

/// Inputs whose planned destination collides with another input.
///
/// An input writing back over its own source is fine; writing over another
/// input's source, or to a destination some other input also writes, is not.
/// Inputs that fail to plan are left for the call to report.
fn conflicting_inputs<S: AsRef<str>>(
    processor: &Processor,
    inputs: &[PathBuf],
    args: &[S],
    options: &CallOptions,
) -> HashMap<PathBuf, PathBuf> {
    let planned: Vec<(&PathBuf, PathBuf)> = inputs
        .iter()
        .filter_map(|input| {
            let chain = processor.plan(input, args, options).ok()?;
            Some((input, chain.paths()?.destination))
        })
        .collect();

    let mut writers: HashMap<&Path, usize> = HashMap::new();
    for (_, destination) in &planned {
        *writers.entry(destination.as_path()).or_default() += 1;
    }
    let sources: HashSet<&Path> = inputs.iter().map(PathBuf::as_path).collect();

    planned
        .iter()
        .filter(|(input, destination)| {
            let shared = writers.get(destination.as_path()).copied().unwrap_or(0) > 1;
            let overwrites_other = destination != *input && sources.contains(destination.as_path());
            let read_while_written = planned
                .iter()
                .any(|(other, d)| other != input && d == *input);
            shared || overwrites_other || read_while_written
        })
        .map(|(input, destination)| ((*input).clone(), destination.clone()))
        .collect()
}

/// Run `processor` over every input in parallel. Results keep input order.
///
/// Inputs that would collide on a file fail with
/// [`ProcessError::Conflict`] and never reach the runner.
pub fn run_batch<R, S>(
    processor: &Processor,
    runner: &R,
    inputs: &[PathBuf],
    args: &[S],
    options: &CallOptions,
) -> Vec<BatchResult>
where
    R: CommandRunner + ?Sized,
    S: AsRef<str> + Sync,
{
    let conflicts = conflicting_inputs(processor, inputs, args, options);

    inputs
        .par_iter()
        .map(|input| {
            let result = match conflicts.get(input) {
                Some(destination) => Err(ProcessError::Conflict {
                    destination: destination.clone(),
                }),
                None => processor
                    .call(runner, input, args, options)
                    .map(|processed| processed.path),
            };
            match &result {
                Ok(destination) => tracing::info!(
                    source = %input.display(),
                    destination = %destination.display(),
                    "processed"
                ),
                Err(err) => tracing::warn!(
                    source = %input.display(),
                    stage = %err.stage(),
                    error = %err,
                    "failed"
                ),
            }
            (input.clone(), result)
        })
        .collect()
}
