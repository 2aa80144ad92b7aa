//! The five resize semantics, as pure descriptor constructors.
//!
//! | Mode | Resize | Extent | Result size |
//! |---|---|---|---|
//! | `limit` | `WxH>` | - | ≤ W×H, never enlarged |
//! | `fit` | `WxH` | - | ≤ W×H, one side touches the box |
//! | `fill` | `WxH^` + gravity | `WxH` | exactly W×H, overflow cropped |
//! | `pad` | `WxH` + background + gravity | `WxH` | exactly W×H, shortfall padded |
//! | `convert` | - | - | unchanged, new encoding |

use super::params::{
    Background, Dimension, Geometry, Gravity, Operation, OperationDescriptor, ResizeFlag,
};
use crate::error::ProcessError;

/// Shrink to fit within `width`×`height`, only if the source is larger.
pub fn limit(width: impl Into<Dimension>, height: impl Into<Dimension>) -> OperationDescriptor {
    OperationDescriptor::resize(Geometry::new(width, height), ResizeFlag::ShrinkOnly)
}

/// Scale up or down to fit within `width`×`height`.
pub fn fit(width: impl Into<Dimension>, height: impl Into<Dimension>) -> OperationDescriptor {
    OperationDescriptor::resize(Geometry::new(width, height), ResizeFlag::Fit)
}

/// Cover `width`×`height`, then crop the overflow around `gravity`.
pub fn fill(
    width: impl Into<Dimension>,
    height: impl Into<Dimension>,
    gravity: Gravity,
) -> OperationDescriptor {
    let target = Geometry::new(width, height);
    OperationDescriptor::resize(target.clone(), ResizeFlag::AtLeast)
        .with_gravity(gravity)
        .with_extent(target)
}

/// Fit within `width`×`height`, then pad the shortfall with `background`.
///
/// `Background::Transparent` is resolved to [`TRANSPARENT_RGBA`](super::TRANSPARENT_RGBA) here.
pub fn pad(
    width: impl Into<Dimension>,
    height: impl Into<Dimension>,
    background: &Background,
    gravity: Gravity,
) -> OperationDescriptor {
    let target = Geometry::new(width, height);
    OperationDescriptor::resize(target.clone(), ResizeFlag::Fit)
        .with_background(background)
        .with_gravity(gravity)
        .with_extent(target)
}

/// Re-encode as `format` (lower-cased, leading dot ignored).
pub fn convert(format: &str) -> Result<Operation, ProcessError> {
    let format = format.trim().trim_start_matches('.').to_lowercase();
    if format.is_empty() {
        return Err(ProcessError::configuration("convert requires a non-empty format"));
    }
    Ok(Operation::Convert {
        format: Some(format),
    })
}
