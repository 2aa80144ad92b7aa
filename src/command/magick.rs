//! ImageMagick runner: turns a chain into one `convert` invocation.
//!
//! The whole chain collapses into a single argument list because every
//! intermediate step streams to the next one:
//!
//! ```text
//! convert <source> [pre-transform args] [main args] [-write <path>] ... <destination>
//! ```
//!
//! | Descriptor part | Arguments |
//! |---|---|
//! | resize | `-resize 400x400^` |
//! | background | `-background rgba(255,255,255,0)` |
//! | gravity | `-gravity Center` |
//! | extent | `-extent 400x400` |
//! | raw arguments | passed through verbatim, last |
//!
//! A step that writes a file before the end of the chain becomes
//! `-write <path>`; the last target becomes the output argument (or
//! [`DEFAULT_OUTPUT`] if the chain still streams).

use super::runner::{CommandRunner, RunError};
use crate::compose::{DEFAULT_OUTPUT, OperationChain, Target};
use crate::geometry::{Operation, OperationDescriptor};
use std::process::Command;

/// Runs chains through an external ImageMagick (or GraphicsMagick) binary.
#[derive(Debug, Clone)]
pub struct MagickRunner {
    /// Program and leading arguments, e.g. `["convert"]` or `["gm", "convert"]`.
    program: Vec<String>,
    quality: Option<u32>,
}

impl MagickRunner {
    pub fn new(program: Vec<String>) -> Self {
        Self {
            program,
            quality: None,
        }
    }

    /// Pass `-quality` to the encoder.
    pub fn with_quality(self, quality: Option<u32>) -> Self {
        Self { quality, ..self }
    }

    pub fn program(&self) -> &[String] {
        &self.program
    }

    /// Full argv (program included) for a chain.
    pub fn command_line(&self, chain: &OperationChain) -> Vec<String> {
        let mut argv = self.program.clone();
        argv.extend(self.arguments(chain));
        argv
    }

    /// Arguments after the program for a chain.
    pub fn arguments(&self, chain: &OperationChain) -> Vec<String> {
        let mut args = vec![chain.source.to_string_lossy().into_owned()];
        let last = chain.steps.len().saturating_sub(1);

        for (i, step) in chain.steps.iter().enumerate() {
            if let Operation::Transform(desc) = &step.operation {
                args.extend(descriptor_arguments(desc));
            }
            if i < last {
                if let Target::Path(path) = &step.target {
                    args.push("-write".into());
                    args.push(path.to_string_lossy().into_owned());
                }
            }
        }

        if let Some(quality) = self.quality {
            args.push("-quality".into());
            args.push(quality.to_string());
        }
        args.push(match chain.final_target() {
            Target::Path(path) => path.to_string_lossy().into_owned(),
            Target::Default => DEFAULT_OUTPUT.to_string(),
        });
        args
    }
}

impl Default for MagickRunner {
    fn default() -> Self {
        Self::new(vec!["convert".to_string()])
    }
}

/// Arguments for one descriptor, in the order the tool needs them.
pub fn descriptor_arguments(desc: &OperationDescriptor) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(resize) = &desc.resize {
        args.push("-resize".to_string());
        args.push(resize.to_string());
    }
    if let Some(background) = &desc.background {
        args.push("-background".to_string());
        args.push(background.clone());
    }
    if let Some(gravity) = desc.gravity {
        args.push("-gravity".to_string());
        args.push(gravity.to_string());
    }
    if let Some(extent) = &desc.extent {
        args.push("-extent".to_string());
        args.push(extent.to_string());
    }
    args.extend(desc.arguments.iter().cloned());
    args
}

impl CommandRunner for MagickRunner {
    fn run(&self, chain: &OperationChain) -> Result<(), RunError> {
        let Some((program, leading)) = self.program.split_first() else {
            return Err(RunError::Unsupported("empty magick program".into()));
        };
        let program = program.clone();
        let args: Vec<String> = leading
            .iter()
            .cloned()
            .chain(self.arguments(chain))
            .collect();
        tracing::debug!(%program, ?args, "running magick");

        let output = Command::new(&program)
            .args(&args)
            .output()
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RunError::Exited {
                program,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::geometry::{self, Background, Gravity};
    use std::path::Path;

    fn args_for(main: Operation, format: Option<&str>) -> Vec<String> {
        let chain = compose(Path::new("/tmp/in.jpg"), main, None, format).unwrap();
        MagickRunner::default().arguments(&chain)
    }

    #[test]
    fn limit_arguments() {
        let args = args_for(
            Operation::Transform(geometry::limit(400u32, 400u32)),
            None,
        );
        assert_eq!(args, ["/tmp/in.jpg", "-resize", "400x400>", "/tmp/in.jpg"]);
    }

    #[test]
    fn fill_arguments() {
        let args = args_for(
            Operation::Transform(geometry::fill(400u32, 300u32, Gravity::North)),
            None,
        );
        assert_eq!(
            args,
            [
                "/tmp/in.jpg",
                "-resize",
                "400x300^",
                "-gravity",
                "North",
                "-extent",
                "400x300",
                "/tmp/in.jpg",
            ]
        );
    }

    #[test]
    fn pad_arguments_with_format() {
        let args = args_for(
            Operation::Transform(geometry::pad(
                400u32,
                400u32,
                &Background::Transparent,
                Gravity::Center,
            )),
            Some("png"),
        );
        assert_eq!(
            args,
            [
                "/tmp/in.jpg",
                "-resize",
                "400x400",
                "-background",
                "rgba(255,255,255,0)",
                "-gravity",
                "Center",
                "-extent",
                "400x400",
                "/tmp/in.png",
            ]
        );
    }

    #[test]
    fn convert_arguments() {
        let args = args_for(geometry::convert("PNG").unwrap(), None);
        assert_eq!(args, ["/tmp/in.jpg", "/tmp/in.png"]);
    }

    #[test]
    fn pre_transform_arguments_come_first() {
        let chain = compose(
            Path::new("/tmp/in.jpg"),
            Operation::Transform(geometry::limit(100u32, 100u32)),
            Some(geometry::fit("50%", "50%")),
            None,
        )
        .unwrap();
        let args = MagickRunner::default().arguments(&chain);
        assert_eq!(
            args,
            [
                "/tmp/in.jpg",
                "-resize",
                "50%x50%",
                "-resize",
                "100x100>",
                "/tmp/in.jpg",
            ]
        );
    }

    #[test]
    fn raw_pre_transform_passes_through() {
        let chain = compose(
            Path::new("/tmp/in.jpg"),
            Operation::Transform(geometry::limit(100u32, 100u32)),
            Some(OperationDescriptor::raw(["-rotate", "90", "-strip"])),
            None,
        )
        .unwrap();
        let args = MagickRunner::default().arguments(&chain);
        assert_eq!(
            args,
            [
                "/tmp/in.jpg",
                "-rotate",
                "90",
                "-strip",
                "-resize",
                "100x100>",
                "/tmp/in.jpg",
            ]
        );
    }

    #[test]
    fn intermediate_file_target_becomes_write() {
        let chain = OperationChain {
            source: "/tmp/in.jpg".into(),
            steps: vec![
                crate::compose::Step {
                    operation: geometry::convert("png").unwrap(),
                    target: Target::Path("/tmp/in.png".into()),
                },
                crate::compose::Step {
                    operation: Operation::Transform(geometry::fit(10u32, 10u32)),
                    target: Target::Path("/tmp/small.png".into()),
                },
            ],
        };
        let args = MagickRunner::default().arguments(&chain);
        assert_eq!(
            args,
            [
                "/tmp/in.jpg",
                "-write",
                "/tmp/in.png",
                "-resize",
                "10x10",
                "/tmp/small.png",
            ]
        );
    }

    #[test]
    fn streaming_chain_ends_in_default_output() {
        let chain = OperationChain {
            source: "/tmp/in.jpg".into(),
            steps: vec![crate::compose::Step {
                operation: Operation::Transform(geometry::fit(10u32, 10u32)),
                target: Target::Default,
            }],
        };
        let args = MagickRunner::default().arguments(&chain);
        assert_eq!(args.last().map(String::as_str), Some(DEFAULT_OUTPUT));
    }

    #[test]
    fn quality_precedes_output() {
        let chain = compose(
            Path::new("/tmp/in.jpg"),
            Operation::Transform(geometry::fit(10u32, 10u32)),
            None,
            None,
        )
        .unwrap();
        let runner = MagickRunner::new(vec!["gm".into(), "convert".into()]).with_quality(Some(85));
        assert_eq!(
            runner.command_line(&chain),
            [
                "gm",
                "convert",
                "/tmp/in.jpg",
                "-resize",
                "10x10",
                "-quality",
                "85",
                "/tmp/in.jpg",
            ]
        );
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let chain = compose(
            Path::new("/tmp/in.jpg"),
            Operation::Transform(geometry::fit(10u32, 10u32)),
            None,
            None,
        )
        .unwrap();
        let runner = MagickRunner::new(vec!["shapeshift-no-such-binary".into()]);
        let err = runner.run(&chain).unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
    }

    #[test]
    fn empty_program_is_rejected() {
        let chain = OperationChain {
            source: "/tmp/in.jpg".into(),
            steps: Vec::new(),
        };
        let err = MagickRunner::new(Vec::new()).run(&chain).unwrap_err();
        assert!(matches!(err, RunError::Unsupported(_)));
    }
}
