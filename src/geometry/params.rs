//! Descriptor types for geometry operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`resolver`](super::resolver) (which decides what a
//! mode means) and the [`command`](crate::command) runners (which turn a
//! descriptor into tool arguments or pixels). Keeping them plain data lets a
//! mock runner inspect exactly what would have been executed.
//!
//! ## Types
//!
//! - [`Dimension`]: One side of a geometry, kept textual (`"400"`, `"50%"`).
//! - [`Geometry`]: `WxH` pair.
//! - [`ResizeSpec`]: Geometry plus a [`ResizeFlag`] (`>`, `^` or none).
//! - [`Gravity`]: Anchor for crops and padding.
//! - [`Background`]: Padding colour; `Transparent` unless told otherwise.
//! - [`OperationDescriptor`]: resize + background + gravity + extent, in tool
//!   order, plus any raw tool arguments a caller wants applied after them.
//! - [`Operation`]: Either a transform or a format conversion/write.

use crate::error::ProcessError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Fully transparent white, the resolved form of [`Background::Transparent`].
///
/// Formats without an alpha channel render it as opaque white.
pub const TRANSPARENT_RGBA: &str = "rgba(255,255,255,0)";

/// One side of a geometry, kept in the tool's textual grammar.
///
/// Not validated here: `"abc"` is accepted and fails when the runner
/// executes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Dimension(String);

impl Dimension {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u32> for Dimension {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for Dimension {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Dimension {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for Dimension {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `WxH` geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub width: Dimension,
    pub height: Dimension,
}

impl Geometry {
    pub fn new(width: impl Into<Dimension>, height: impl Into<Dimension>) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How a resize treats the source relative to the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFlag {
    /// Scale up or down to fit inside the box.
    #[default]
    Fit,
    /// Only shrink, and only if the source exceeds the box (`>`).
    ShrinkOnly,
    /// Scale until both sides are at least the box (`^`).
    AtLeast,
}

impl ResizeFlag {
    pub fn suffix(self) -> &'static str {
        match self {
            ResizeFlag::Fit => "",
            ResizeFlag::ShrinkOnly => ">",
            ResizeFlag::AtLeast => "^",
        }
    }
}

/// Resize geometry plus policy flag, rendered as e.g. `400x400>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResizeSpec {
    pub geometry: Geometry,
    pub flag: ResizeFlag,
}

impl fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.geometry, self.flag.suffix())
    }
}

/// Anchor point for cropping (fill) and placement (pad).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Gravity {
    #[default]
    Center,
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Gravity {
    pub const ALL: [Gravity; 9] = [
        Gravity::Center,
        Gravity::North,
        Gravity::South,
        Gravity::East,
        Gravity::West,
        Gravity::NorthEast,
        Gravity::NorthWest,
        Gravity::SouthEast,
        Gravity::SouthWest,
    ];

    /// Name as the tool spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            Gravity::Center => "Center",
            Gravity::North => "North",
            Gravity::South => "South",
            Gravity::East => "East",
            Gravity::West => "West",
            Gravity::NorthEast => "NorthEast",
            Gravity::NorthWest => "NorthWest",
            Gravity::SouthEast => "SouthEast",
            Gravity::SouthWest => "SouthWest",
        }
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gravity {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center" | "centre" | "c" => Ok(Gravity::Center),
            "north" | "n" => Ok(Gravity::North),
            "south" | "s" => Ok(Gravity::South),
            "east" | "e" => Ok(Gravity::East),
            "west" | "w" => Ok(Gravity::West),
            "northeast" | "ne" => Ok(Gravity::NorthEast),
            "northwest" | "nw" => Ok(Gravity::NorthWest),
            "southeast" | "se" => Ok(Gravity::SouthEast),
            "southwest" | "sw" => Ok(Gravity::SouthWest),
            _ => Err(ProcessError::configuration(format!("unknown gravity: {s}"))),
        }
    }
}

/// Padding colour for [`pad`](super::pad).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    Transparent,
    /// Any colour string the tool understands (`"red"`, `"#ff0000"`, ...).
    Color(String),
}

impl Background {
    /// The colour string handed to the tool.
    pub fn resolve(&self) -> String {
        match self {
            Background::Transparent => TRANSPARENT_RGBA.to_string(),
            Background::Color(color) => color.clone(),
        }
    }
}

impl From<&str> for Background {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("transparent") {
            Background::Transparent
        } else {
            Background::Color(value.to_string())
        }
    }
}

/// A single transform, with its parts in the order the tool applies them.
///
/// Immutable once built: each `with_*` consumes and returns the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OperationDescriptor {
    pub resize: Option<ResizeSpec>,
    /// Already-resolved colour string (never the `Transparent` sentinel).
    pub background: Option<String>,
    pub gravity: Option<Gravity>,
    /// Exact output canvas; crops overflow and pads shortfall.
    pub extent: Option<Geometry>,
    /// Tool arguments passed through verbatim (`-rotate 90`, `-strip`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

impl OperationDescriptor {
    pub fn resize(geometry: Geometry, flag: ResizeFlag) -> Self {
        Self {
            resize: Some(ResizeSpec { geometry, flag }),
            ..Self::default()
        }
    }

    /// A descriptor made only of raw tool arguments.
    pub fn raw<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_background(self, background: &Background) -> Self {
        Self {
            background: Some(background.resolve()),
            ..self
        }
    }

    pub fn with_gravity(self, gravity: Gravity) -> Self {
        Self {
            gravity: Some(gravity),
            ..self
        }
    }

    pub fn with_extent(self, extent: Geometry) -> Self {
        Self {
            extent: Some(extent),
            ..self
        }
    }

    /// True when the descriptor carries no operation at all.
    pub fn is_empty(&self) -> bool {
        self.resize.is_none()
            && self.background.is_none()
            && self.gravity.is_none()
            && self.extent.is_none()
            && self.arguments.is_empty()
    }
}

/// One step's worth of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Transform(OperationDescriptor),
    /// Encode the current image. `None` keeps the current format.
    Convert { format: Option<String> },
}
