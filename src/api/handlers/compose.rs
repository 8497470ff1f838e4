//! Composition endpoint

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info};
use utoipa::ToSchema;

use r_photobooth::domain::{parse_hex_color, FilterSettings, StickerPlacement, TextBlock, Transform};
use r_photobooth::engine::{compose, ComposeError, CompositionRequest, PhotoInput};

use super::{decode_image, error_response, join_error, png_data_url, status_for, Dimensions, ErrorResponse};
use crate::AppState;

/// One photo of a composition
#[derive(Debug, Deserialize, ToSchema)]
pub struct PhotoPayload {
    /// Base64 image data, optionally as a data URL
    pub data: String,
    /// `#RRGGBB` to flatten a background-removed (RGBA) photo onto
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub filters: FilterSettings,
}

/// Request body for a composition
#[derive(Debug, Deserialize, ToSchema)]
pub struct ComposeRequest {
    pub template_id: String,
    /// One photo per template hole, in hole order
    pub photos: Vec<PhotoPayload>,
    /// Per-hole transformations; defaults to the template's own
    #[serde(default)]
    pub transformations: Vec<Transform>,
    #[serde(default)]
    pub stickers: Vec<StickerPlacement>,
    #[serde(default)]
    pub texts: Vec<TextBlock>,
}

#[derive(Serialize, ToSchema)]
pub struct ComposeResponse {
    pub success: bool,
    /// PNG data URL of the composed image
    pub image: String,
    pub metadata: ComposeMetadata,
}

#[derive(Serialize, ToSchema)]
pub struct ComposeMetadata {
    pub generation_time_ms: u64,
    pub template_used: String,
    pub dimensions: Dimensions,
    pub photos_drawn: usize,
    pub overlays_skipped: usize,
}

fn error_code(e: &ComposeError) -> &'static str {
    match e {
        ComposeError::SizeMismatch { .. } => "SIZE_MISMATCH",
        ComposeError::InvalidInput(_) => "INVALID_INPUT",
        ComposeError::Decode(_) => "INVALID_IMAGE",
        ComposeError::Template(_) => "TEMPLATE_ERROR",
        ComposeError::Internal(_) => "COMPOSITION_FAILED",
    }
}

fn decode_photos(photos: Vec<PhotoPayload>) -> Result<Vec<PhotoInput>, ComposeError> {
    photos
        .into_iter()
        .enumerate()
        .map(|(index, photo)| {
            let image =
                decode_image(&photo.data).map_err(|e| ComposeError::InvalidInput(format!("photo {}: {}", index, e)))?;
            let background_color = photo
                .background_color
                .as_deref()
                .map(parse_hex_color)
                .transpose()
                .map_err(|e| ComposeError::InvalidInput(format!("photo {}: {}", index, e)))?;
            Ok(PhotoInput {
                image,
                background_color,
                filters: photo.filters,
            })
        })
        .collect()
}

/// POST /api/v1/compose - Compose photos, stickers and text onto a template
#[utoipa::path(
    post,
    path = "/api/v1/compose",
    tag = "compose",
    request_body = ComposeRequest,
    responses(
        (status = 200, description = "Image composed successfully", body = ComposeResponse),
        (status = 400, description = "Invalid photos, transformations or photo count", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse),
        (status = 500, description = "Composition failed", body = ErrorResponse)
    )
)]
pub async fn compose_image(state: web::Data<AppState>, body: web::Json<ComposeRequest>) -> HttpResponse {
    let start = Instant::now();
    let body = body.into_inner();

    info!(
        template_id = %body.template_id,
        photos = body.photos.len(),
        stickers = body.stickers.len(),
        texts = body.texts.len(),
        "Processing composition request"
    );

    let template = match state.templates.get(&body.template_id) {
        Some(t) => t,
        None => {
            error!(template_id = %body.template_id, "Template not found");
            return error_response(
                StatusCode::NOT_FOUND,
                "TEMPLATE_NOT_FOUND",
                format!("Template '{}' does not exist", body.template_id),
            );
        }
    };

    let max_photos = state.settings.engine.max_photos;
    if body.photos.len() > max_photos {
        return error_response(
            StatusCode::BAD_REQUEST,
            "TOO_MANY_PHOTOS",
            format!("At most {} photos per composition", max_photos),
        );
    }

    let fonts = state.fonts.clone();
    let stickers = state.stickers.clone();
    let grain_seed = state.settings.engine.random_grain_seed;
    let template_id = body.template_id.clone();

    // Decoding and compositing are CPU-bound
    let outcome = tokio::task::spawn_blocking(move || {
        let request = CompositionRequest {
            photos: decode_photos(body.photos)?,
            transformations: body.transformations,
            stickers: body.stickers,
            texts: body.texts,
            grain_seed,
        };
        let result = compose(&template, request, &fonts, &stickers)?;
        let png = result.encode_png().map_err(|e| ComposeError::Internal(e.to_string()))?;
        Ok::<_, ComposeError>((result, png))
    })
    .await;

    let (result, png) = match outcome {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => {
            error!(error = %e, template_id = %template_id, "Composition failed");
            return error_response(status_for(e.is_client_error()), error_code(&e), e.to_string());
        }
        Err(e) => return join_error(e),
    };

    let elapsed = start.elapsed().as_millis() as u64;
    info!(
        template_id = %template_id,
        generation_time_ms = elapsed,
        bytes = png.len(),
        "Composition complete"
    );

    HttpResponse::Ok().json(ComposeResponse {
        success: true,
        image: png_data_url(&png),
        metadata: ComposeMetadata {
            generation_time_ms: elapsed,
            template_used: template_id,
            dimensions: Dimensions {
                width: result.width(),
                height: result.height(),
            },
            photos_drawn: result.photos_drawn,
            overlays_skipped: result.overlays_skipped,
        },
    })
}
