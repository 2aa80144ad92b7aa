//! Processor dispatch: the five named strategies and the call pipeline.
//!
//! A [`Processor`] is bound to one [`Mode`] when it is created, so an unknown
//! mode name fails at registration time, never in the middle of a call.
//! Each call then walks the same states:
//!
//! ```text
//! Idle → Resolving → Composing → Executing → Done
//!                                    └──────→ Failed
//! ```
//!
//! Nothing is kept between calls. Calls on different files can run
//! concurrently; two calls on the same path race and the last writer wins.

use crate::command::CommandRunner;
use crate::compose::{OperationChain, compose};
use crate::error::ProcessError;
use crate::geometry::{self, Background, Gravity, Operation, OperationDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The closed set of geometry strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Convert,
    Limit,
    Fit,
    Fill,
    Pad,
}

impl Mode {
    pub const ALL: [Mode; 5] = [Mode::Convert, Mode::Limit, Mode::Fit, Mode::Fill, Mode::Pad];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Convert => "convert",
            Mode::Limit => "limit",
            Mode::Fit => "fit",
            Mode::Fill => "fill",
            Mode::Pad => "pad",
        }
    }

    /// Positional argument names, optional ones last.
    pub fn usage(self) -> &'static str {
        match self {
            Mode::Convert => "<format>",
            Mode::Limit | Mode::Fit => "<width> <height>",
            Mode::Fill => "<width> <height> [gravity]",
            Mode::Pad => "<width> <height> [background] [gravity]",
        }
    }

    fn arity(self) -> (usize, usize) {
        match self {
            Mode::Convert => (1, 1),
            Mode::Limit | Mode::Fit => (2, 2),
            Mode::Fill => (2, 3),
            Mode::Pad => (2, 4),
        }
    }

    /// Resolve positional arguments into the mode's operation.
    pub fn resolve<S: AsRef<str>>(self, args: &[S]) -> Result<Operation, ProcessError> {
        let (min, max) = self.arity();
        if args.len() < min || args.len() > max {
            return Err(ProcessError::configuration(format!(
                "{} expects {} but got {} argument(s)",
                self,
                self.usage(),
                args.len()
            )));
        }
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let arg = |i: usize| args.get(i).copied();
        let gravity = |i: usize| arg(i).map(Gravity::from_str).transpose();

        let (w, h) = (arg(0).unwrap_or_default(), arg(1).unwrap_or_default());
        let op = match self {
            Mode::Convert => return geometry::convert(w),
            Mode::Limit => geometry::limit(w, h),
            Mode::Fit => geometry::fit(w, h),
            Mode::Fill => geometry::fill(w, h, gravity(2)?.unwrap_or_default()),
            Mode::Pad => {
                let background = arg(2).map(Background::from).unwrap_or_default();
                geometry::pad(w, h, &background, gravity(3)?.unwrap_or_default())
            }
        };
        Ok(Operation::Transform(op))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProcessError::configuration(format!("unknown processor mode: {s}")))
    }
}

/// Parse a pre-transform.
///
/// Two forms are accepted:
/// - `mode:arg,arg`, e.g. `fit:800,800`. Only geometry modes make sense
///   before another operation.
/// - raw tool arguments starting with `-`, e.g. `-rotate 90 -strip`,
///   split on whitespace and passed through untouched.
pub fn parse_transform(spec: &str) -> Result<OperationDescriptor, ProcessError> {
    let spec = spec.trim();
    if spec.starts_with('-') {
        return Ok(OperationDescriptor::raw(spec.split_whitespace()));
    }
    let (name, args) = spec.split_once(':').unwrap_or((spec, ""));
    let args: Vec<&str> = if args.is_empty() {
        Vec::new()
    } else {
        args.split(',').map(str::trim).collect()
    };
    match name.parse::<Mode>()?.resolve(&args)? {
        Operation::Transform(desc) => Ok(desc),
        Operation::Convert { .. } => Err(ProcessError::configuration(
            "a pre-transform cannot be a format conversion",
        )),
    }
}

/// Optional inputs to [`Processor::call`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Target format for the final write (`None` writes in place).
    pub format: Option<String>,
    /// Applied to the source before the main operation.
    pub pre_transform: Option<OperationDescriptor>,
}

impl CallOptions {
    /// Build options from a format and an optional pre-transform (see [`parse_transform`]).
    pub fn parse(format: Option<String>, pre: Option<&str>) -> Result<Self, ProcessError> {
        Ok(Self {
            format,
            pre_transform: pre.map(parse_transform).transpose()?,
        })
    }

    pub fn with_format(self, format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            ..self
        }
    }

    pub fn with_pre_transform(self, pre_transform: OperationDescriptor) -> Self {
        Self {
            pre_transform: Some(pre_transform),
            ..self
        }
    }
}

/// The result of a successful call: the final path, opened for reading.
#[derive(Debug)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub file: File,
}

impl ProcessedFile {
    pub fn into_file(self) -> File {
        self.file
    }
}

/// One registered strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Processor {
    mode: Mode,
}

impl Processor {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    /// Look a strategy up by name; unknown names are a configuration error.
    pub fn named(name: &str) -> Result<Self, ProcessError> {
        Ok(Self::new(name.parse()?))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Resolve and compose without executing anything.
    pub fn plan<S: AsRef<str>>(
        &self,
        input: &Path,
        args: &[S],
        options: &CallOptions,
    ) -> Result<OperationChain, ProcessError> {
        tracing::debug!(mode = %self.mode, input = %input.display(), "resolving");
        let main = self.mode.resolve(args)?;

        tracing::debug!(mode = %self.mode, "composing");
        compose(
            input,
            main,
            options.pre_transform.clone(),
            options.format.as_deref(),
        )
    }

    /// Run the strategy against `input` and open the result.
    pub fn call<S: AsRef<str>>(
        &self,
        runner: &(impl CommandRunner + ?Sized),
        input: &Path,
        args: &[S],
        options: &CallOptions,
    ) -> Result<ProcessedFile, ProcessError> {
        let chain = self.plan(input, args, options)?;
        let Some(pair) = chain.paths() else {
            // compose always ends in a file; a streaming chain has nothing to open
            return Err(ProcessError::configuration(
                "operation chain does not produce a file",
            ));
        };

        tracing::debug!(
            mode = %self.mode,
            steps = chain.steps.len(),
            destination = %pair.destination.display(),
            "executing"
        );
        if let Err(err) = runner.run(&chain) {
            tracing::debug!(mode = %self.mode, error = %err, "failed");
            return Err(err.into());
        }

        let file = match File::open(&pair.destination) {
            Ok(file) => file,
            Err(source) => {
                tracing::debug!(
                    mode = %self.mode,
                    destination = %pair.destination.display(),
                    error = %source,
                    "failed"
                );
                return Err(ProcessError::Io {
                    path: pair.destination,
                    source,
                });
            }
        };
        tracing::debug!(mode = %self.mode, destination = %pair.destination.display(), "done");
        Ok(ProcessedFile {
            path: pair.destination,
            file,
        })
    }
}

/// Name → processor table, the host-facing registration surface.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    processors: BTreeMap<String, Processor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All five strategies under their own names.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for mode in Mode::ALL {
            registry.insert(mode.name(), Processor::new(mode));
        }
        registry
    }

    /// Register `mode_name` under `name`. Unknown modes fail here.
    pub fn register(&mut self, name: &str, mode_name: &str) -> Result<(), ProcessError> {
        let processor = Processor::named(mode_name)?;
        self.insert(name, processor);
        Ok(())
    }

    pub fn insert(&mut self, name: &str, processor: Processor) {
        self.processors.insert(name.to_string(), processor);
    }

    pub fn get(&self, name: &str) -> Option<&Processor> {
        self.processors.get(name)
    }

    /// Like [`get`](Self::get), but a miss is a configuration error.
    pub fn require(&self, name: &str) -> Result<&Processor, ProcessError> {
        self.get(name)
            .ok_or_else(|| ProcessError::configuration(format!("no processor named '{name}'")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Processor)> {
        self.processors.iter().map(|(name, p)| (name.as_str(), p))
    }
}
