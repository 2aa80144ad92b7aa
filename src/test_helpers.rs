//! Shared test utilities for the shapeshift test suite.
//!
//! Synthetic images with a known pixel pattern, so tests can assert on
//! dimensions and on where the source landed inside a padded or cropped
//! canvas.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let source = tmp.path().join("portrait.png");
//! create_test_png(&source, 600, 800);
//! assert_eq!(dimensions(&source), (600, 800));
//! ```

use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

// =========================================================================
// Fixture images
// =========================================================================

/// Write an opaque gradient JPEG: `rgb(x % 256, y % 256, 128)`.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write an opaque gradient PNG with the same pattern as [`create_test_jpeg`].
///
/// PNG is lossless, so pixel assertions can be exact.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

// =========================================================================
// Inspection
// =========================================================================

/// Decode `path` and return the RGBA pixel at `(x, y)`.
pub fn pixel_at(path: &Path, x: u32, y: u32) -> Rgba<u8> {
    let img = image::open(path)
        .unwrap_or_else(|e| panic!("cannot open {}: {e}", path.display()))
        .to_rgba8();
    *img.get_pixel(x, y)
}

/// Width and height read from the file header.
pub fn dimensions(path: &Path) -> (u32, u32) {
    image::image_dimensions(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}
