use serde::Deserialize;
use serde_json::json;
use warp::{Rejection, Reply};

use crate::warp_helpers::processing_error;
use crate::{codec, compositor, encoder};

#[derive(Debug, Deserialize)]
pub struct CompositeRequest {
    pub image: String,
    #[serde(rename = "bgColor")]
    pub bg_color: Option<String>,
}

/// Flattens a possibly-transparent photo onto a solid background color
/// and returns the opaque result as a PNG data URL.
pub async fn process_photo(request: CompositeRequest) -> Result<impl Reply, Rejection> {
    let color_param = request.bg_color.as_deref().unwrap_or("#FFFFFF");
    let color = compositor::parse_color(color_param).map_err(processing_error)?;

    let photo = codec::decode_data_url(&request.image).map_err(processing_error)?;
    let flattened = compositor::flatten(&photo, color).map_err(processing_error)?;
    let bytes = encoder::encode_png(&flattened).map_err(processing_error)?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "image": codec::to_data_url(&bytes, "image/png"),
    })))
}
