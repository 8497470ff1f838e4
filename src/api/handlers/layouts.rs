//! Layout listing and thumbnails

use actix_web::{web, HttpResponse};
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

use r_photobooth::engine::{render_layout_thumbnail, Raster};

use super::templates::LayoutQuery;
use super::{error_response, join_error, ErrorResponse};
use crate::AppState;

/// Number of pastel colours the thumbnail cycles through
const THUMBNAIL_PALETTE_SIZE: usize = 6;

#[derive(Serialize, ToSchema)]
pub struct LayoutInfo {
    pub aspect_ratio: String,
    pub cell_layout: String,
    pub template_count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct LayoutsResponse {
    pub success: bool,
    pub data: Vec<LayoutInfo>,
}

/// GET /api/v1/layouts - Distinct layouts with template counts
#[utoipa::path(
    get,
    path = "/api/v1/layouts",
    tag = "layouts",
    responses(
        (status = 200, description = "Available layouts", body = LayoutsResponse)
    )
)]
pub async fn list_layouts(state: web::Data<AppState>) -> HttpResponse {
    let data = state
        .templates
        .layouts()
        .into_iter()
        .map(|layout| LayoutInfo {
            aspect_ratio: layout.aspect_ratio.to_string(),
            cell_layout: layout.cell_layout.to_string(),
            template_count: state.templates.by_layout(&layout.aspect_ratio, &layout.cell_layout).len(),
        })
        .collect();

    HttpResponse::Ok().json(LayoutsResponse { success: true, data })
}

/// GET /api/v1/layouts/thumbnail - Pastel preview of a layout
#[utoipa::path(
    get,
    path = "/api/v1/layouts/thumbnail",
    tag = "layouts",
    params(LayoutQuery),
    responses(
        (status = 200, description = "Layout thumbnail", content_type = "image/png"),
        (status = 400, description = "Malformed layout", body = ErrorResponse)
    )
)]
pub async fn layout_thumbnail(query: web::Query<LayoutQuery>) -> HttpResponse {
    let (aspect_ratio, cell_layout) = match query.layout() {
        Ok(layout) => layout,
        Err(response) => return response,
    };

    let offset = rand::thread_rng().gen_range(0..THUMBNAIL_PALETTE_SIZE);
    let outcome = tokio::task::spawn_blocking(move || {
        render_layout_thumbnail(&aspect_ratio, &cell_layout, offset).map(|thumbnail| Raster::Rgb(thumbnail).encode_png())
    })
    .await;

    match outcome {
        Ok(Ok(Ok(png))) => HttpResponse::Ok().content_type("image/png").body(png),
        Ok(Err(e)) => error_response(actix_web::http::StatusCode::BAD_REQUEST, "INVALID_LAYOUT", e.to_string()),
        Ok(Ok(Err(e))) => error_response(
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
            "ENCODING_FAILED",
            e.to_string(),
        ),
        Err(e) => join_error(e),
    }
}
