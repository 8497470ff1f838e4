//! Font listing

use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct FontsResponse {
    pub success: bool,
    /// Font file names usable as `font` in text blocks
    pub data: Vec<String>,
}

/// GET /api/v1/fonts - Fonts available for text blocks
#[utoipa::path(
    get,
    path = "/api/v1/fonts",
    tag = "assets",
    responses(
        (status = 200, description = "Available fonts", body = FontsResponse)
    )
)]
pub async fn list_fonts(state: web::Data<AppState>) -> HttpResponse {
    let fonts = state.fonts.clone();
    let data = match tokio::task::spawn_blocking(move || fonts.names()).await {
        Ok(names) => names,
        Err(e) => return super::join_error(e),
    };
    HttpResponse::Ok().json(FontsResponse { success: true, data })
}
