use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use warp::{Rejection, Reply};

use crate::encoder::Quality;
use crate::error::ProcessError;
use crate::matting::MattingEngine;
use crate::warp_helpers::processing_error;
use crate::{codec, encoder};

#[derive(Debug, Deserialize)]
pub struct RemovalRequest {
    pub image: String,
    pub quality: Option<String>,
}

/// Runs the configured matting backend over the photo and returns the
/// alpha-matted PNG. The remote backend blocks on network I/O, so the
/// whole pipeline runs on the blocking pool.
pub async fn remove_background(
    request: RemovalRequest,
    matting: Arc<dyn MattingEngine>,
) -> Result<impl Reply, Rejection> {
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ProcessError> {
        let quality = Quality::parse(request.quality.as_deref().unwrap_or("high"));
        let photo = codec::decode_data_url(&request.image)?;
        let matted = matting.matte(photo)?;
        encoder::encode_matted_png(&matted, quality)
    })
    .await
    .map_err(|e| {
        processing_error(ProcessError::Matting(format!(
            "background removal task failed: {}",
            e
        )))
    })?;

    let bytes = result.map_err(processing_error)?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "image": codec::to_data_url(&bytes, "image/png"),
    })))
}
