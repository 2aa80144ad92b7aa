//! Colour strings as ImageMagick accepts them, for the native runner.
//!
//! Parsing is delegated to `csscolorparser`, which covers the CSS named
//! colours, `#hex` in all its lengths and the `rgb()`, `rgba()`, `hsl()`,
//! `hsla()`, `hwb()` functional forms. `none` is ImageMagick's spelling of
//! fully transparent and is handled here.

use image::Rgba;

/// Parse a colour string. `None` if it is not one we understand.
pub fn parse_color(raw: &str) -> Option<Rgba<u8>> {
    let color = raw.trim().to_ascii_lowercase();
    if color == "none" {
        return Some(Rgba([0, 0, 0, 0]));
    }
    color
        .parse::<csscolorparser::Color>()
        .ok()
        .map(|c| Rgba(c.to_rgba8()))
}
