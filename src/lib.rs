//! # Shapeshift
//!
//! Declarative image transform pipelines for upload handling: name a
//! strategy (`limit`, `fit`, `fill`, `pad`, `convert`), give it a size, and
//! get back the processed file.
//!
//! # Architecture: Resolve → Compose → Execute
//!
//! Every call goes through three independent stages:
//!
//! ```text
//! 1. Resolve   mode + args        →  Operation          (pure geometry)
//! 2. Compose   pre + main + format →  OperationChain     (pure, immutable)
//! 3. Execute   OperationChain     →  file on disk       (CommandRunner)
//! ```
//!
//! The first two stages never touch the filesystem, so the whole pipeline
//! can be inspected (`shapeshift plan`) or unit-tested without an image tool
//! installed. Only the runner does I/O.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Descriptor types and the five geometry resolvers |
//! | [`compose`] | Builds the ordered [`OperationChain`](compose::OperationChain) for a call |
//! | [`processor`] | Named strategies, the per-call state machine, the registry |
//! | [`command`] | The [`CommandRunner`](command::CommandRunner) seam: ImageMagick argv or pure-Rust execution |
//! | [`batch`] | Input expansion and parallel fan-out for the CLI |
//! | [`config`] | `shapeshift.toml` loading, validation, merging and presets |
//! | [`error`] | [`ProcessError`](error::ProcessError) and the stage it came from |
//! | [`output`] | CLI output formatting for plans and batch results |
//!
//! # Example
//!
//! ```no_run
//! use shapeshift::command::MagickRunner;
//! use shapeshift::processor::{CallOptions, Processor};
//! use std::path::Path;
//!
//! let thumb = Processor::named("fill")?;
//! let processed = thumb.call(
//!     &MagickRunner::default(),
//!     Path::new("uploads/portrait.jpg"),
//!     &["400", "400", "north"],
//!     &CallOptions::default().with_format("webp"),
//! )?;
//! assert_eq!(processed.path, Path::new("uploads/portrait.webp"));
//! # Ok::<(), shapeshift::error::ProcessError>(())
//! ```
//!
//! # Design Decisions
//!
//! ## Streaming Intermediates
//!
//! Steps that feed the next step write to the tool's default output
//! (`miff:-`) instead of a temporary file. The compositor decides whether a
//! final write is still needed by looking at where the chain currently ends,
//! so a `convert` main operation is never written twice.
//!
//! ## Two Runners, One Chain
//!
//! [`MagickRunner`](command::MagickRunner) renders a chain as a single
//! ImageMagick invocation; [`NativeRunner`](command::NativeRunner) executes
//! the same chain with the `image` crate for hosts without the binary. Both
//! take the chain as plain data, so adding a runner never touches dispatch.

pub mod batch;
pub mod command;
pub mod compose;
pub mod config;
pub mod error;
pub mod geometry;
pub mod output;
pub mod processor;

#[cfg(test)]
pub(crate) mod test_helpers;
