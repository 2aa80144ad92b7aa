//! Command building and execution.
//!
//! | Part | Role |
//! |---|---|
//! | [`CommandRunner`] | The seam dispatch depends on: run a chain, leave the destination on disk |
//! | [`MagickRunner`] | Renders the chain as ImageMagick argv and spawns it |
//! | [`NativeRunner`] | Executes the chain in-process with the `image` crate |
//! | [`calculations`] | Pure dimension maths behind `-resize` and `-extent` |
//!
//! The module is split into:
//! - **Runner**: [`CommandRunner`] trait + [`RunError`]
//! - **Backends**: [`magick`] and [`native`]
//! - **Calculations / colour**: pure helpers for the native backend

pub mod calculations;
mod color;
pub mod magick;
pub mod native;
mod runner;

pub use magick::MagickRunner;
pub use native::NativeRunner;
pub use runner::{CommandRunner, RunError};

#[cfg(test)]
pub(crate) use runner::tests::MockRunner;
