//! Background Compositor
//!
//! Flattens a possibly-transparent foreground onto a solid background
//! color, producing an opaque image of identical dimensions. Inputs
//! without an alpha channel pass through unchanged.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use crate::error::ProcessError;

/// Parses a hex color string (`#RRGGBB`, `RRGGBB` or `#RGB`) into an
/// RGB triple.
pub fn parse_color(input: &str) -> Result<Rgb<u8>, ProcessError> {
    let hex = input.trim().trim_start_matches('#');

    let expanded;
    let hex = match hex.len() {
        6 => hex,
        3 => {
            expanded = hex.chars().flat_map(|c| [c, c]).collect::<String>();
            expanded.as_str()
        }
        _ => return Err(ProcessError::InvalidColor(input.to_string())),
    };

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ProcessError::InvalidColor(input.to_string()));
    }

    let r = u8::from_str_radix(&hex[0..2], 16)
        .map_err(|_| ProcessError::InvalidColor(input.to_string()))?;
    let g = u8::from_str_radix(&hex[2..4], 16)
        .map_err(|_| ProcessError::InvalidColor(input.to_string()))?;
    let b = u8::from_str_radix(&hex[4..6], 16)
        .map_err(|_| ProcessError::InvalidColor(input.to_string()))?;

    Ok(Rgb([r, g, b]))
}

/// Blends the image over the background color, weighting each source
/// pixel by its own alpha and the background by the remainder.
///
/// Opaque pixels round-trip exactly: fg * 255 / 255 == fg with the
/// round-half-up arithmetic below.
pub fn flatten(image: &DynamicImage, background: Rgb<u8>) -> Result<RgbImage, ProcessError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ProcessError::EmptyImage);
    }

    // No transparency information: the blend is a plain copy.
    if !image.color().has_alpha() {
        return Ok(image.to_rgb8());
    }

    let source = image.to_rgba8();
    let mut flattened = RgbImage::new(width, height);

    for (src, dst) in source.pixels().zip(flattened.pixels_mut()) {
        let alpha = src[3] as u32;
        for channel in 0..3 {
            let fg = src[channel] as u32;
            let bg = background[channel] as u32;
            dst[channel] = ((fg * alpha + bg * (255 - alpha) + 127) / 255) as u8;
        }
    }

    Ok(flattened)
}
