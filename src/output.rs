//! CLI output formatting for plans and batch runs.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! photos/portrait.jpg
//!     001 -resize 400x400^ -gravity Center -extent 400x400 → (stream)
//!     002 write webp → photos/portrait.webp
//!     $ convert photos/portrait.jpg -resize '400x400^' ... photos/portrait.webp
//! ```
//!
//! ## Process
//!
//! ```text
//! photos/portrait.jpg → photos/portrait.webp
//! photos/broken.jpg: execute failed: Execution failed: convert exited with status 1: ...
//!
//! Processed 1 file, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>` or `String`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::command::magick::descriptor_arguments;
use crate::compose::{OperationChain, Target};
use crate::error::ProcessError;
use crate::geometry::Operation;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Format a 1-based step index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Quote an argument for display if a shell would split or expand it.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:%,+=@".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Describe one operation in the tool's own vocabulary.
///
/// ```text
/// -resize 400x400>
/// write png
/// write (same format)
/// ```
pub fn format_operation(operation: &Operation) -> String {
    match operation {
        Operation::Transform(desc) if desc.is_empty() => "(no-op)".to_string(),
        Operation::Transform(desc) => descriptor_arguments(desc).join(" "),
        Operation::Convert { format: Some(format) } => format!("write {format}"),
        Operation::Convert { format: None } => "write (same format)".to_string(),
    }
}

fn format_target(target: &Target) -> String {
    match target {
        Target::Default => "(stream)".to_string(),
        Target::Path(path) => path.display().to_string(),
    }
}

/// Format a plan: the source, one line per step, then the command line.
pub fn format_plan(chain: &OperationChain, argv: &[String]) -> Vec<String> {
    let mut lines = vec![chain.source.display().to_string()];
    for (i, step) in chain.steps.iter().enumerate() {
        lines.push(format!(
            "{}{} {} → {}",
            indent(1),
            format_index(i + 1),
            format_operation(&step.operation),
            format_target(&step.target)
        ));
    }
    let command: Vec<String> = argv.iter().map(|arg| shell_quote(arg)).collect();
    lines.push(format!("{}$ {}", indent(1), command.join(" ")));
    lines
}

/// Print a plan to stdout.
pub fn print_plan(chain: &OperationChain, argv: &[String]) {
    for line in format_plan(chain, argv) {
        println!("{}", line);
    }
}

/// Machine-readable plan for `plan --json`.
#[derive(Debug, Serialize)]
pub struct PlanReport<'a> {
    pub chain: &'a OperationChain,
    pub argv: &'a [String],
}

/// Format one batch result.
///
/// ```text
/// in.jpg → in.png
/// broken.jpg: execute failed: Execution failed: ...
/// ```
pub fn format_result(source: &Path, result: &Result<PathBuf, ProcessError>) -> String {
    match result {
        Ok(destination) => format!("{} → {}", source.display(), destination.display()),
        Err(err) => format!("{}: {} failed: {}", source.display(), err.stage(), err),
    }
}

/// Closing summary line of a batch run.
pub fn format_summary(processed: usize, failed: usize) -> String {
    let files = if processed == 1 { "file" } else { "files" };
    match failed {
        0 => format!("Processed {} {}", processed, files),
        n => format!("Processed {} {}, {} failed", processed, files, n),
    }
}

/// Print batch results and the summary to stdout.
pub fn print_results(results: &[(PathBuf, Result<PathBuf, ProcessError>)]) {
    for (source, result) in results {
        println!("{}", format_result(source, result));
    }
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    println!();
    println!("{}", format_summary(results.len() - failed, failed));
}
