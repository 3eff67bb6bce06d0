//! Output encoding
//!
//! Maps the caller-facing format and quality tier onto concrete
//! encoder settings: JPEG quality 95/85/70, PNG preview resize tiers,
//! and the 300 DPI metadata stamped on every sheet (`pHYs` chunk for
//! PNG, JFIF APP0 density for JPEG) via `img-parts`.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};
use img_parts::jpeg::{markers, Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};

use crate::error::ProcessError;

/// 300 DPI expressed in pixels per meter, for the PNG pHYs chunk.
const PIXELS_PER_METER: u32 = 11_811;
const DPI_DENSITY: u16 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            _ => Err(()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl Quality {
    /// Unrecognized strings degrade to Low rather than erroring,
    /// matching the tier table the browser client relies on.
    pub fn parse(s: &str) -> Self {
        match s {
            "high" => Quality::High,
            "medium" => Quality::Medium,
            _ => Quality::Low,
        }
    }

    pub fn jpeg_quality(self) -> u8 {
        match self {
            Quality::High => 95,
            Quality::Medium => 85,
            Quality::Low => 70,
        }
    }

    /// Resize factor for the PNG preview path; High keeps full size.
    pub fn png_scale(self) -> Option<f32> {
        match self {
            Quality::High => None,
            Quality::Medium => Some(0.75),
            Quality::Low => Some(0.5),
        }
    }
}

/// Encodes a finished sheet. The sheet keeps its full pixel size in
/// every tier; quality only affects JPEG compression. Output always
/// carries 300x300 DPI metadata.
pub fn encode_sheet(
    sheet: &RgbImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, ProcessError> {
    let mut buffer = Cursor::new(Vec::new());

    match format {
        OutputFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.jpeg_quality());
            encoder.encode_image(sheet).map_err(encode_error)?;
            stamp_jpeg_dpi(buffer.into_inner())
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer)
                .write_image(
                    sheet.as_raw(),
                    sheet.width(),
                    sheet.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(encode_error)?;
            stamp_png_dpi(buffer.into_inner())
        }
    }
}

/// Encodes an alpha-matted image as PNG with the preview quality
/// policy: full size at High, Lanczos downscale to 75% / 50% with
/// optimized encoding at Medium / Low.
pub fn encode_matted_png(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, ProcessError> {
    let mut buffer = Cursor::new(Vec::new());

    match quality.png_scale() {
        None => image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(encode_error)?,
        Some(scale) => {
            let width = ((image.width() as f32 * scale) as u32).max(1);
            let height = ((image.height() as f32 * scale) as u32).max(1);
            let resized = image
                .resize_exact(width, height, FilterType::Lanczos3)
                .to_rgba8();

            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive)
                .write_image(resized.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(encode_error)?;
        }
    }

    Ok(buffer.into_inner())
}

/// Plain full-size PNG, used for flattened composites.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ProcessError> {
    let mut buffer = Cursor::new(Vec::new());
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(encode_error)?;
    Ok(buffer.into_inner())
}

fn encode_error(e: image::ImageError) -> ProcessError {
    ProcessError::Encode(e.to_string())
}

/// Inserts a pHYs chunk ahead of the image data. 11811 px/m == 300 DPI.
fn stamp_png_dpi(bytes: Vec<u8>) -> Result<Vec<u8>, ProcessError> {
    let mut png =
        Png::from_bytes(bytes.into()).map_err(|e| ProcessError::Encode(e.to_string()))?;

    let mut contents = Vec::with_capacity(9);
    contents.extend_from_slice(&PIXELS_PER_METER.to_be_bytes());
    contents.extend_from_slice(&PIXELS_PER_METER.to_be_bytes());
    contents.push(1); // unit: meter
    let phys = PngChunk::new(*b"pHYs", contents.into());

    let chunks = png.chunks_mut();
    let at = chunks
        .iter()
        .position(|chunk| chunk.kind() == *b"IDAT")
        .unwrap_or(chunks.len());
    chunks.insert(at, phys);

    Ok(png.encoder().bytes().to_vec())
}

/// Replaces (or inserts) the JFIF APP0 segment with one declaring
/// 300x300 dots per inch.
fn stamp_jpeg_dpi(bytes: Vec<u8>) -> Result<Vec<u8>, ProcessError> {
    let mut jpeg =
        Jpeg::from_bytes(bytes.into()).map_err(|e| ProcessError::Encode(e.to_string()))?;

    let mut contents = Vec::with_capacity(14);
    contents.extend_from_slice(b"JFIF\0");
    contents.extend_from_slice(&[1, 2]); // JFIF version 1.02
    contents.push(1); // density unit: dots per inch
    contents.extend_from_slice(&DPI_DENSITY.to_be_bytes());
    contents.extend_from_slice(&DPI_DENSITY.to_be_bytes());
    contents.extend_from_slice(&[0, 0]); // no thumbnail
    let app0 = JpegSegment::new_with_contents(markers::APP0, contents.into());

    let segments = jpeg.segments_mut();
    match segments
        .iter()
        .position(|segment| segment.marker() == markers::APP0)
    {
        Some(at) => segments[at] = app0,
        None => segments.insert(0, app0),
    }

    Ok(jpeg.encoder().bytes().to_vec())
}
