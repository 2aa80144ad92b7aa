//! The execution seam: something that can run an [`OperationChain`].
//!
//! Two implementations ship with the crate:
//! [`MagickRunner`](super::magick::MagickRunner) spawns ImageMagick, and
//! [`NativeRunner`](super::native::NativeRunner) executes the same chain with
//! the `image` crate. Dispatch code only sees [`CommandRunner`], so tests can
//! swap in a recording mock.

use crate::compose::OperationChain;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    /// The tool ran and exited non-zero (or was killed: `code` is `None`).
    #[error("{program} exited with status {}: {stderr}", code.map_or("signal".to_string(), |c| c.to_string()))]
    Exited {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    /// The tool could not be started (missing binary, permission denied).
    #[error("Failed to invoke {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
    /// A geometry, colour or format the runner cannot interpret.
    #[error("Unsupported value: {0}")]
    Unsupported(String),
}

impl RunError {
    /// Exit code of the external tool, when there was one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunError::Exited { code, .. } => *code,
            _ => None,
        }
    }
}

/// Runs a fully composed chain against the filesystem.
///
/// Implementations must leave the chain's final target on disk when they
/// return `Ok`. They are shared across worker threads in batch runs.
pub trait CommandRunner: Sync {
    fn run(&self, chain: &OperationChain) -> Result<(), RunError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock runner that records chains without executing them.
    ///
    /// When `touch_output` is set it creates an empty file at the chain's
    /// destination so the caller's open succeeds.
    #[derive(Default)]
    pub struct MockRunner {
        pub chains: Mutex<Vec<OperationChain>>,
        pub touch_output: bool,
        pub fail_with: Option<i32>,
    }

    impl MockRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn touching() -> Self {
            Self {
                touch_output: true,
                ..Self::default()
            }
        }

        pub fn failing(code: i32) -> Self {
            Self {
                fail_with: Some(code),
                ..Self::default()
            }
        }

        pub fn get_chains(&self) -> Vec<OperationChain> {
            self.chains.lock().unwrap().clone()
        }
    }

    impl CommandRunner for MockRunner {
        fn run(&self, chain: &OperationChain) -> Result<(), RunError> {
            self.chains.lock().unwrap().push(chain.clone());

            if let Some(code) = self.fail_with {
                return Err(RunError::Exited {
                    program: "mock".into(),
                    code: Some(code),
                    stderr: "mock failure".into(),
                });
            }
            if self.touch_output {
                if let Some(path) = chain.final_target().path() {
                    std::fs::write(path, b"")?;
                }
            }
            Ok(())
        }
    }

    #[test]
    fn mock_records_chain() {
        let runner = MockRunner::new();
        let chain = OperationChain {
            source: "/test/image.jpg".into(),
            steps: Vec::new(),
        };
        runner.run(&chain).unwrap();

        let chains = runner.get_chains();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].source, std::path::PathBuf::from("/test/image.jpg"));
    }

    #[test]
    fn mock_failure_carries_exit_code() {
        let runner = MockRunner::failing(3);
        let chain = OperationChain {
            source: "/test/image.jpg".into(),
            steps: Vec::new(),
        };
        let err = runner.run(&chain).unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        assert!(err.to_string().contains("exited with status 3"));
    }

    #[test]
    fn exited_without_code_reports_signal() {
        let err = RunError::Exited {
            program: "convert".into(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("status signal"));
        assert_eq!(err.exit_code(), None);
    }
}
