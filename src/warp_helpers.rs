use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

use warp::{reject, Filter, Rejection, Reply};

use crate::error::ProcessError;
use crate::matting::MattingEngine;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct ProcessingRejection {
    pub error: ProcessError,
}

impl reject::Reject for ProcessingRejection {}

pub fn processing_error(error: ProcessError) -> Rejection {
    reject::custom(ProcessingRejection { error })
}

pub fn with_matting(
    matting: Arc<dyn MattingEngine>,
) -> impl Filter<Extract = (Arc<dyn MattingEngine>,), Error = Infallible> + Clone {
    warp::any().map(move || matting.clone())
}

fn status_for(error: &ProcessError) -> warp::http::StatusCode {
    use warp::http::StatusCode;

    match error {
        ProcessError::InvalidImage(_)
        | ProcessError::InvalidColor(_)
        | ProcessError::InvalidDimensions(_)
        | ProcessError::UnsupportedFormat(_)
        | ProcessError::EmptyImage => StatusCode::BAD_REQUEST,
        ProcessError::Matting(_) => StatusCode::BAD_GATEWAY,
        ProcessError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(processing) = err.find::<ProcessingRejection>() {
        code = status_for(&processing.error);
        message = processing.error.to_string();
        if code.is_server_error() {
            log::error!("Request failed: {}", processing.error);
        }
    } else if let Some(body_error) = err.find::<warp::filters::body::BodyDeserializeError>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = format!("Invalid request body: {}", body_error);
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = warp::http::StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large".to_string();
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        code = warp::http::StatusCode::UNSUPPORTED_MEDIA_TYPE;
        message = "Unsupported media type".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn limited_route(
        limit: u64,
    ) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        warp::post()
            .and(warp::body::content_length_limit(limit))
            .and(warp::body::json::<Value>())
            .map(|_body: Value| warp::reply::json(&serde_json::json!({ "success": true })))
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let route = limited_route(64).recover(handle_rejection);

        let response = warp::test::request()
            .method("POST")
            .json(&serde_json::json!({ "image": "A".repeat(256) }))
            .reply(&route)
            .await;

        assert_eq!(response.status(), 413);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["code"], 413);
        assert_eq!(body["error"], "Payload too large");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_body_within_limit_passes() {
        let route = limited_route(1024).recover(handle_rejection);

        let response = warp::test::request()
            .method("POST")
            .json(&serde_json::json!({ "image": "ok" }))
            .reply(&route)
            .await;

        assert_eq!(response.status(), 200);
    }
}
