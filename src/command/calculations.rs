//! Pure calculation functions for executing geometries.
//!
//! All functions here are pure and testable without any I/O or images.
//! They mirror how ImageMagick interprets `-resize` and `-extent`, which is
//! what [`NativeRunner`](super::native::NativeRunner) needs to produce the
//! same output sizes.

use crate::geometry::{Gravity, ResizeFlag};

/// One side of a geometry after parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Empty side: derive it from the aspect ratio.
    Auto,
    Pixels(u32),
    Percent(f64),
}

/// Parse one side of a geometry (`"400"`, `"50%"`, `""`).
///
/// Returns `None` for anything the tool would reject: garbage, zero,
/// negative or non-finite values.
pub fn parse_length(raw: &str) -> Option<Length> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(Length::Auto);
    }
    if let Some(percent) = raw.strip_suffix('%') {
        let value: f64 = percent.trim().parse().ok()?;
        return (value.is_finite() && value > 0.0).then_some(Length::Percent(value));
    }
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value < 0.5 {
        return None;
    }
    Some(Length::Pixels(value.round() as u32))
}

/// Turn parsed lengths into absolute bounds relative to `current`.
///
/// Percentages are taken of the matching side; `Auto` stays unconstrained.
pub fn resolve_bounds(
    width: Length,
    height: Length,
    current: (u32, u32),
) -> (Option<u32>, Option<u32>) {
    fn absolute(length: Length, side: u32) -> Option<u32> {
        match length {
            Length::Auto => None,
            Length::Pixels(px) => Some(px),
            Length::Percent(p) => Some(((side as f64 * p / 100.0).round() as u32).max(1)),
        }
    }
    (absolute(width, current.0), absolute(height, current.1))
}

/// `side * num / den`, rounded, never below one pixel.
fn scale(side: u32, num: u32, den: u32) -> u32 {
    ((side as f64 * num as f64 / den as f64).round() as u32).max(1)
}

/// Calculate dimensions that fit inside a target box (resize without crop).
///
/// Preserves the source aspect ratio; one side matches the box exactly and
/// the other is at most the box.
///
/// # Examples
/// ```
/// # use shapeshift::command::calculations::calculate_fit_dimensions;
/// // 600x800 portrait into 400x400 → 300x400
/// assert_eq!(calculate_fit_dimensions((600, 800), (400, 400)), (300, 400));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    if src_w as u64 * tgt_h as u64 >= src_h as u64 * tgt_w as u64 {
        // Source is wider: width matches, height shrinks
        (tgt_w, scale(src_h, tgt_w, src_w))
    } else {
        // Source is taller: height matches, width shrinks
        (scale(src_w, tgt_h, src_h), tgt_h)
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    if src_w as u64 * tgt_h as u64 > src_h as u64 * tgt_w as u64 {
        // Source is wider: height will match, width will exceed
        (scale(src_w, tgt_h, src_h), tgt_h)
    } else {
        // Source is taller: width will match, height will exceed
        (tgt_w, scale(src_h, tgt_w, src_w))
    }
}

/// Output size of a `-resize` with the given bounds and flag.
pub fn calculate_resize(
    source: (u32, u32),
    bounds: (Option<u32>, Option<u32>),
    flag: ResizeFlag,
) -> (u32, u32) {
    let (src_w, src_h) = source;
    let exceeds = match bounds {
        (Some(w), Some(h)) => src_w > w || src_h > h,
        (Some(w), None) => src_w > w,
        (None, Some(h)) => src_h > h,
        (None, None) => false,
    };
    if flag == ResizeFlag::ShrinkOnly && !exceeds {
        return source;
    }

    match bounds {
        (Some(w), Some(h)) if flag == ResizeFlag::AtLeast => {
            calculate_fill_dimensions(source, (w, h))
        }
        (Some(w), Some(h)) => calculate_fit_dimensions(source, (w, h)),
        (Some(w), None) => (w, scale(src_h, w, src_w)),
        (None, Some(h)) => (scale(src_w, h, src_h), h),
        (None, None) => source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Start,
    Middle,
    End,
}

fn anchors(gravity: Gravity) -> (Anchor, Anchor) {
    use Anchor::*;
    match gravity {
        Gravity::NorthWest => (Start, Start),
        Gravity::North => (Middle, Start),
        Gravity::NorthEast => (End, Start),
        Gravity::West => (Start, Middle),
        Gravity::Center => (Middle, Middle),
        Gravity::East => (End, Middle),
        Gravity::SouthWest => (Start, End),
        Gravity::South => (Middle, End),
        Gravity::SouthEast => (End, End),
    }
}

fn offset(anchor: Anchor, canvas: u32, image: u32) -> i64 {
    let slack = canvas as i64 - image as i64;
    match anchor {
        Anchor::Start => 0,
        Anchor::Middle => slack / 2,
        Anchor::End => slack,
    }
}

/// Where the image's top-left corner lands on an extent canvas.
///
/// Negative offsets mean the image overflows and gets cropped (fill);
/// positive offsets leave padding (pad).
pub fn gravity_offset(gravity: Gravity, canvas: (u32, u32), image: (u32, u32)) -> (i64, i64) {
    let (h, v) = anchors(gravity);
    (offset(h, canvas.0, image.0), offset(v, canvas.1, image.1))
}
