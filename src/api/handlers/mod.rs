//! HTTP request handlers

pub mod assets;
pub mod compose;
pub mod filters;
pub mod health;
pub mod layouts;
pub mod templates;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use r_photobooth::engine::Raster;

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ApiError,
}

#[derive(Serialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

pub fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        success: false,
        error: ApiError {
            code: code.to_string(),
            message: message.into(),
        },
    })
}

/// 400 for client errors, 500 otherwise
pub fn status_for(client_error: bool) -> StatusCode {
    if client_error {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Decode base64 image bytes, accepting an optional `data:...;base64,` prefix
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = match payload.split_once(";base64,") {
        Some((_, data)) => data,
        None => payload,
    };
    STANDARD.decode(encoded.trim())
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Decode a base64 payload all the way to a raster
pub fn decode_image(payload: &str) -> Result<Raster, String> {
    let bytes = decode_base64(payload).map_err(|e| format!("invalid base64: {}", e))?;
    Raster::decode(&bytes).map_err(|e| format!("invalid image: {}", e))
}

/// Response for a blocking task that panicked or was cancelled
pub fn join_error(e: tokio::task::JoinError) -> HttpResponse {
    error!(error = %e, "Blocking task failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Processing task failed")
}
