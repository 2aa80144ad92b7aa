//! Geometry resolution: mode semantics to operation descriptors.
//!
//! Pure and I/O-free. The module is split into:
//! - **Parameters**: the descriptor types ([`OperationDescriptor`], [`Gravity`], ...)
//! - **Resolver**: one constructor per mode ([`limit`], [`fit`], [`fill`], [`pad`], [`convert`])

mod params;
mod resolver;

pub use params::{
    Background, Dimension, Geometry, Gravity, Operation, OperationDescriptor, ResizeFlag,
    ResizeSpec, TRANSPARENT_RGBA,
};
pub use resolver::{convert, fill, fit, limit, pad};
