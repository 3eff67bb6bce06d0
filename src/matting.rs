//! Background matting collaborator
//!
//! The compositor and layout engine only ever see "a possibly
//! transparent image"; how transparency is produced is behind one
//! trait. The engine is constructed once at startup from config and
//! injected into handlers for the process lifetime.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};

use crate::config::MattingConfig;
use crate::error::ProcessError;

/// Produces an alpha-matted image from an opaque input.
pub trait MattingEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns an RGBA image of the same pixel dimensions where the
    /// background is transparent. Implementations that cannot isolate
    /// the subject return the input converted to RGBA unchanged.
    fn matte(&self, image: DynamicImage) -> Result<DynamicImage, ProcessError>;
}

/// No-op backend: converts to RGBA without touching any pixel.
/// Useful when segmentation runs client-side or is unavailable.
pub struct PassthroughMatting;

impl MattingEngine for PassthroughMatting {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn matte(&self, image: DynamicImage) -> Result<DynamicImage, ProcessError> {
        Ok(DynamicImage::ImageRgba8(image.to_rgba8()))
    }
}

/// Remote segmentation service: POSTs the photo as PNG and expects an
/// alpha-matted PNG back. The endpoint and API key come from config.
pub struct RemoteMatting {
    endpoint: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl RemoteMatting {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        RemoteMatting {
            endpoint,
            api_key,
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

impl MattingEngine for RemoteMatting {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn matte(&self, image: DynamicImage) -> Result<DynamicImage, ProcessError> {
        let mut payload = Cursor::new(Vec::new());
        image
            .write_to(&mut payload, ImageFormat::Png)
            .map_err(|e| ProcessError::Encode(e.to_string()))?;
        let payload = payload.into_inner();

        let mut request = self
            .agent
            .post(&self.endpoint)
            .header("Content-Type", "image/png");
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let mut response = request
            .send(&payload[..])
            .map_err(|e| ProcessError::Matting(e.to_string()))?;

        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ProcessError::Matting(e.to_string()))?;

        let matted = image::load_from_memory(&body).map_err(|e| {
            ProcessError::Matting(format!("service returned undecodable image: {}", e))
        })?;

        Ok(DynamicImage::ImageRgba8(matted.to_rgba8()))
    }
}

/// Builds the engine selected by config.
pub fn from_config(config: &MattingConfig) -> Result<Arc<dyn MattingEngine>, ProcessError> {
    match config.backend.as_str() {
        "passthrough" => Ok(Arc::new(PassthroughMatting)),
        "remote" => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                ProcessError::Matting(
                    "remote matting backend requires SNAPSHEET_MATTING_URL".to_string(),
                )
            })?;
            Ok(Arc::new(RemoteMatting::new(
                endpoint,
                config.api_key.clone(),
            )))
        }
        other => Err(ProcessError::Matting(format!(
            "unknown matting backend: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_passthrough_preserves_pixels_and_adds_alpha() {
        let photo = DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([9, 8, 7])));
        let matted = PassthroughMatting.matte(photo).unwrap();

        assert_eq!((matted.width(), matted.height()), (6, 4));
        assert!(matted.color().has_alpha());
        let rgba = matted.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0, [9, 8, 7, 255]);
    }

    #[test]
    fn test_from_config_selects_backend() {
        let engine = from_config(&MattingConfig {
            backend: "passthrough".to_string(),
            endpoint: None,
            api_key: None,
        })
        .unwrap();
        assert_eq!(engine.name(), "passthrough");

        let engine = from_config(&MattingConfig {
            backend: "remote".to_string(),
            endpoint: Some("http://localhost:9999/matte".to_string()),
            api_key: Some("key".to_string()),
        })
        .unwrap();
        assert_eq!(engine.name(), "remote");
    }

    #[test]
    fn test_from_config_rejects_bad_setups() {
        let missing_endpoint = from_config(&MattingConfig {
            backend: "remote".to_string(),
            endpoint: None,
            api_key: None,
        });
        assert!(matches!(missing_endpoint, Err(ProcessError::Matting(_))));

        let unknown = from_config(&MattingConfig {
            backend: "onnx".to_string(),
            endpoint: None,
            api_key: None,
        });
        assert!(matches!(unknown, Err(ProcessError::Matting(_))));
    }
}
