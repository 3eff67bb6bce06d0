use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;

use crate::error::ProcessError;

/// Decodes a base64-encoded image, stripping an optional
/// `data:<mime>;base64,` header first. Accepts PNG, JPEG and WEBP.
pub fn decode_data_url(data: &str) -> Result<DynamicImage, ProcessError> {
    let payload = match data.split_once(',') {
        Some((header, rest)) if header.starts_with("data:") => rest,
        _ => data,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ProcessError::InvalidImage(format!("base64 decode failed: {}", e)))?;

    image::load_from_memory(&bytes).map_err(|e| ProcessError::InvalidImage(e.to_string()))
}

/// Wraps encoded image bytes in a `data:<mime>;base64,` URL.
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}
