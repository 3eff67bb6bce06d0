use thiserror::Error;

/// Error types for photo processing operations
///
/// All variants are request-local; none are fatal to the process. The
/// HTTP status mapping lives in `warp_helpers`.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Invalid background color: {0}")]
    InvalidColor(String),
    #[error("Invalid photo dimensions: {0}")]
    InvalidDimensions(String),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("Image has no pixels")]
    EmptyImage,
    #[error("Background removal failed: {0}")]
    Matting(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}
