use log::info;
use serde::Deserialize;
use serde_json::json;
use warp::{Rejection, Reply};

use crate::encoder::{OutputFormat, Quality};
use crate::error::ProcessError;
use crate::sheet_layout::{PhotoSize, PASSPORT_HEIGHT_IN, PASSPORT_WIDTH_IN};
use crate::warp_helpers::processing_error;
use crate::{codec, encoder, sheet_layout};

#[derive(Debug, Deserialize)]
pub struct SheetRequest {
    pub image: String,
    pub format: Option<String>,
    pub quality: Option<String>,
    #[serde(rename = "photoWidth")]
    pub photo_width: Option<f64>,
    #[serde(rename = "photoHeight")]
    pub photo_height: Option<f64>,
}

/// Tiles the photo onto a 4x6in print sheet and returns the encoded
/// sheet plus the number of photos placed.
pub async fn generate_sheet(request: SheetRequest) -> Result<impl Reply, Rejection> {
    let format_param = request.format.as_deref().unwrap_or("png");
    let format = format_param
        .parse::<OutputFormat>()
        .map_err(|_| processing_error(ProcessError::UnsupportedFormat(format_param.to_string())))?;
    let quality = Quality::parse(request.quality.as_deref().unwrap_or("high"));

    let size = PhotoSize::new(
        request.photo_width.unwrap_or(PASSPORT_WIDTH_IN),
        request.photo_height.unwrap_or(PASSPORT_HEIGHT_IN),
    )
    .map_err(processing_error)?;

    let photo = codec::decode_data_url(&request.image).map_err(processing_error)?;
    let rendered = sheet_layout::render_sheet(&photo, size);
    let bytes = encoder::encode_sheet(&rendered.image, format, quality).map_err(processing_error)?;

    info!(
        "Generated {} sheet with {} photos of {}x{}px",
        format,
        rendered.placed,
        size.width_px(),
        size.height_px()
    );

    Ok(warp::reply::json(&json!({
        "success": true,
        "image": codec::to_data_url(&bytes, format.mime()),
        "count": rendered.placed,
    })))
}
