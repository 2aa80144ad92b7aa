//! Pure Rust runner: executes a chain with the `image` crate.
//!
//! Produces the same output geometry as the ImageMagick argv built by
//! [`MagickRunner`](super::magick::MagickRunner), without the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader`, format guessed from content |
//! | `-resize` | [`calculate_resize`] + `DynamicImage::resize_exact` (`Lanczos3`) |
//! | `-extent` | background canvas + `imageops::overlay` at [`gravity_offset`] |
//! | Encode | by destination extension; JPEG honours `quality` |
//!
//! Formats without alpha (JPEG) drop the alpha channel on write, so a
//! transparent `rgba(255,255,255,0)` padding comes out opaque white.

use super::calculations::{calculate_resize, gravity_offset, parse_length, resolve_bounds};
use super::color::parse_color;
use super::runner::{CommandRunner, RunError};
use crate::compose::{OperationChain, Target};
use crate::geometry::{Geometry, Gravity, Operation, OperationDescriptor, ResizeFlag};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::path::Path;

/// Extent background when the descriptor sets none (the tool's default).
const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Largest image the runner will allocate, in pixels (1 GiB as RGBA8).
pub const MAX_PIXELS: u64 = 1 << 28;

/// Refuse sizes past [`MAX_PIXELS`] before anything is allocated.
fn check_area(width: u32, height: u32) -> Result<(), RunError> {
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(RunError::Unsupported(format!(
            "{width}x{height} exceeds the {MAX_PIXELS} pixel limit"
        )));
    }
    Ok(())
}

/// Extensions whose codecs are compiled in.
const SUPPORTED: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

/// Returns the image file extensions the native runner can read and write.
pub fn supported_extensions() -> Vec<&'static str> {
    SUPPORTED.iter().map(|(ext, _)| *ext).collect()
}

fn format_for(path: &Path) -> Result<ImageFormat, RunError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    SUPPORTED
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, format)| *format)
        .ok_or_else(|| RunError::Unsupported(format!("output format '{ext}'")))
}

/// Pure Rust runner using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Default)]
pub struct NativeRunner {
    quality: Option<u8>,
}

impl NativeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// JPEG encoding quality (1-100); `None` keeps the encoder default.
    pub fn with_quality(self, quality: Option<u32>) -> Self {
        Self {
            quality: quality.map(|q| q.clamp(1, 100) as u8),
        }
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, RunError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

fn parse_geometry(
    geometry: &Geometry,
    current: (u32, u32),
) -> Result<(Option<u32>, Option<u32>), RunError> {
    let width = parse_length(geometry.width.as_str());
    let height = parse_length(geometry.height.as_str());
    match (width, height) {
        (Some(w), Some(h)) => Ok(resolve_bounds(w, h, current)),
        _ => Err(RunError::Unsupported(format!("geometry '{geometry}'"))),
    }
}

fn resize(
    img: DynamicImage,
    geometry: &Geometry,
    flag: ResizeFlag,
) -> Result<DynamicImage, RunError> {
    let current = (img.width(), img.height());
    let bounds = parse_geometry(geometry, current)?;
    let (w, h) = calculate_resize(current, bounds, flag);
    if (w, h) == current {
        return Ok(img);
    }
    check_area(w, h)?;
    Ok(img.resize_exact(w, h, FilterType::Lanczos3))
}

/// Place `img` on a `geometry`-sized canvas, cropping or padding around `gravity`.
fn extent(
    img: DynamicImage,
    geometry: &Geometry,
    gravity: Gravity,
    background: Rgba<u8>,
) -> Result<DynamicImage, RunError> {
    let current = (img.width(), img.height());
    let (Some(w), Some(h)) = parse_geometry(geometry, current)? else {
        return Err(RunError::Unsupported(format!(
            "extent '{geometry}' needs both sides"
        )));
    };

    check_area(w, h)?;
    let mut canvas = RgbaImage::from_pixel(w, h, background);
    let (x, y) = gravity_offset(gravity, (w, h), current);
    image::imageops::overlay(&mut canvas, &img.to_rgba8(), x, y);
    Ok(DynamicImage::ImageRgba8(canvas))
}

fn apply(img: DynamicImage, desc: &OperationDescriptor) -> Result<DynamicImage, RunError> {
    let mut img = img;
    if let Some(spec) = &desc.resize {
        img = resize(img, &spec.geometry, spec.flag)?;
    }
    if let Some(geometry) = &desc.extent {
        let background = match &desc.background {
            Some(color) => parse_color(color)
                .ok_or_else(|| RunError::Unsupported(format!("colour '{color}'")))?,
            None => DEFAULT_BACKGROUND,
        };
        img = extent(img, geometry, desc.gravity.unwrap_or_default(), background)?;
    }
    Ok(img)
}

impl NativeRunner {
    /// Save an image, inferring the format from the extension.
    fn save_image(&self, img: &DynamicImage, path: &Path) -> Result<(), RunError> {
        let format = format_for(path)?;
        match format {
            ImageFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                let file = std::fs::File::create(path)?;
                let writer = std::io::BufWriter::new(file);
                let encoder = match self.quality {
                    Some(quality) => JpegEncoder::new_with_quality(writer, quality),
                    None => JpegEncoder::new(writer),
                };
                rgb.write_with_encoder(encoder)?;
            }
            _ => {
                DynamicImage::ImageRgba8(img.to_rgba8()).save_with_format(path, format)?;
            }
        }
        Ok(())
    }
}

impl CommandRunner for NativeRunner {
    fn run(&self, chain: &OperationChain) -> Result<(), RunError> {
        let mut img = load_image(&chain.source)?;
        tracing::debug!(
            source = %chain.source.display(),
            width = img.width(),
            height = img.height(),
            "decoded source"
        );

        for step in &chain.steps {
            if let Operation::Transform(desc) = &step.operation {
                if !desc.arguments.is_empty() {
                    return Err(RunError::Unsupported(format!(
                        "raw tool arguments '{}'",
                        desc.arguments.join(" ")
                    )));
                }
                img = apply(img, desc)?;
            }
            if let Target::Path(path) = &step.target {
                self.save_image(&img, path)?;
                tracing::debug!(
                    output = %path.display(),
                    width = img.width(),
                    height = img.height(),
                    "wrote step output"
                );
            }
        }
        Ok(())
    }
}
