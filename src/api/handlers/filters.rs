//! Filter preview endpoint

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

use r_photobooth::domain::FilterSettings;
use r_photobooth::engine::{apply_filters, apply_filters_with_rng};

use super::{decode_image, error_response, join_error, png_data_url, ErrorResponse};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FilterRequest {
    /// Base64 image data, optionally as a data URL
    pub image: String,
    #[serde(default)]
    pub filters: FilterSettings,
}

#[derive(Serialize, ToSchema)]
pub struct FilterResponse {
    pub success: bool,
    /// PNG data URL of the filtered image
    pub image: String,
}

/// POST /api/v1/filters/apply - Preview filters on a single photo
#[utoipa::path(
    post,
    path = "/api/v1/filters/apply",
    tag = "compose",
    request_body = FilterRequest,
    responses(
        (status = 200, description = "Filtered image", body = FilterResponse),
        (status = 400, description = "Invalid image or filter values", body = ErrorResponse)
    )
)]
pub async fn apply_filter_preview(state: web::Data<AppState>, body: web::Json<FilterRequest>) -> HttpResponse {
    let body = body.into_inner();
    if let Err(e) = body.filters.validate() {
        return error_response(StatusCode::BAD_REQUEST, "INVALID_FILTERS", e.to_string());
    }

    let seed = state.settings.engine.random_grain_seed;
    let outcome = tokio::task::spawn_blocking(move || {
        let photo = decode_image(&body.image)?;
        let filtered = match seed {
            Some(seed) => apply_filters_with_rng(photo, &body.filters, &mut StdRng::seed_from_u64(seed)),
            None => apply_filters(photo, &body.filters),
        };
        filtered.encode_png().map_err(|e| e.to_string())
    })
    .await;

    match outcome {
        Ok(Ok(png)) => {
            debug!(bytes = png.len(), "Filter preview rendered");
            HttpResponse::Ok().json(FilterResponse {
                success: true,
                image: png_data_url(&png),
            })
        }
        Ok(Err(message)) => {
            error!(error = %message, "Filter preview failed");
            error_response(StatusCode::BAD_REQUEST, "INVALID_IMAGE", message)
        }
        Err(e) => join_error(e),
    }
}
