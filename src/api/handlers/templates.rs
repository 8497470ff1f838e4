//! Template management endpoints

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use r_photobooth::domain::{AspectRatio, CellLayout, Hole, Transform};
use r_photobooth::engine::{Raster, StylePreset, Template, TemplateError};

use super::{decode_base64, error_response, join_error, status_for, ErrorResponse};
use crate::AppState;

/// Template as returned by the API
#[derive(Serialize, ToSchema)]
pub struct TemplateInfo {
    pub id: String,
    pub aspect_ratio: String,
    pub cell_layout: String,
    pub width: u32,
    pub height: u32,
    pub hole_count: usize,
    pub holes: Vec<Hole>,
    pub transformations: Vec<Transform>,
    pub is_default: bool,
    pub style: Option<StylePreset>,
}

impl From<&Template> for TemplateInfo {
    fn from(template: &Template) -> Self {
        let metadata = &template.metadata;
        TemplateInfo {
            id: metadata.id.clone(),
            aspect_ratio: metadata.aspect_ratio.to_string(),
            cell_layout: metadata.cell_layout.to_string(),
            width: template.image.width(),
            height: template.image.height(),
            hole_count: metadata.holes.len(),
            holes: metadata.holes.clone(),
            transformations: metadata.transformations.clone(),
            is_default: metadata.is_default,
            style: metadata.style,
        }
    }
}

/// Response for listing templates
#[derive(Serialize, ToSchema)]
pub struct TemplatesListResponse {
    pub success: bool,
    pub data: Vec<TemplateInfo>,
    pub count: usize,
}

/// Response for a single template
#[derive(Serialize, ToSchema)]
pub struct TemplateResponse {
    pub success: bool,
    pub data: TemplateInfo,
}

/// Layout filter for template queries
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LayoutQuery {
    /// Aspect ratio, e.g. "4:3"
    pub aspect_ratio: String,
    /// Grid shape as COLSxROWS, e.g. "1x4"
    pub cell_layout: String,
}

impl LayoutQuery {
    pub fn layout(&self) -> Result<(AspectRatio, CellLayout), HttpResponse> {
        let aspect_ratio = self
            .aspect_ratio
            .parse::<AspectRatio>()
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, "INVALID_LAYOUT", format!("{}", e)))?;
        let cell_layout = self
            .cell_layout
            .parse::<CellLayout>()
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, "INVALID_LAYOUT", format!("{}", e)))?;
        Ok((aspect_ratio, cell_layout))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadTemplateRequest {
    /// Base64 PNG with transparent holes, optionally as a data URL
    pub image: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateTemplateRequest {
    pub aspect_ratio: String,
    pub cell_layout: String,
    #[serde(default)]
    pub style: StylePreset,
}

fn template_error(e: &TemplateError) -> HttpResponse {
    let code = match e {
        TemplateError::NotFound(_) => return error_response(StatusCode::NOT_FOUND, "TEMPLATE_NOT_FOUND", e.to_string()),
        TemplateError::Holes(_) => "NO_USABLE_HOLES",
        TemplateError::InvalidFormat | TemplateError::Decode(_) => "INVALID_IMAGE",
        TemplateError::InvalidLayout(_) => "INVALID_LAYOUT",
        _ => "TEMPLATE_ERROR",
    };
    error_response(status_for(e.is_client_error()), code, e.to_string())
}

fn list_response(templates: Vec<Arc<Template>>) -> HttpResponse {
    let data: Vec<TemplateInfo> = templates.iter().map(|t| TemplateInfo::from(t.as_ref())).collect();
    HttpResponse::Ok().json(TemplatesListResponse {
        success: true,
        count: data.len(),
        data,
    })
}

/// GET /api/v1/templates - List all templates
#[utoipa::path(
    get,
    path = "/api/v1/templates",
    tag = "templates",
    responses(
        (status = 200, description = "List of all templates", body = TemplatesListResponse)
    )
)]
pub async fn list_templates(state: web::Data<AppState>) -> HttpResponse {
    let templates = state.templates.list();
    info!(count = templates.len(), "Retrieved templates list");
    list_response(templates)
}

/// GET /api/v1/templates/{template_id} - Get single template by ID
#[utoipa::path(
    get,
    path = "/api/v1/templates/{template_id}",
    tag = "templates",
    params(
        ("template_id" = String, Path, description = "Template identifier")
    ),
    responses(
        (status = 200, description = "Template details", body = TemplateResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn get_template(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let template_id = path.into_inner();
    match state.templates.get(&template_id) {
        Some(template) => HttpResponse::Ok().json(TemplateResponse {
            success: true,
            data: TemplateInfo::from(template.as_ref()),
        }),
        None => template_error(&TemplateError::NotFound(template_id)),
    }
}

/// GET /api/v1/templates/{template_id}/image - Template PNG
#[utoipa::path(
    get,
    path = "/api/v1/templates/{template_id}/image",
    tag = "templates",
    params(
        ("template_id" = String, Path, description = "Template identifier")
    ),
    responses(
        (status = 200, description = "Template image", content_type = "image/png"),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn get_template_image(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let template_id = path.into_inner();
    let Some(template) = state.templates.get(&template_id) else {
        return template_error(&TemplateError::NotFound(template_id));
    };

    let outcome = tokio::task::spawn_blocking(move || Raster::Rgba(template.image.clone()).encode_png()).await;
    match outcome {
        Ok(Ok(png)) => HttpResponse::Ok().content_type("image/png").body(png),
        Ok(Err(e)) => template_error(&TemplateError::ImageLoad(e)),
        Err(e) => join_error(e),
    }
}

/// GET /api/v1/templates/by-layout - Templates matching a layout
#[utoipa::path(
    get,
    path = "/api/v1/templates/by-layout",
    tag = "templates",
    params(LayoutQuery),
    responses(
        (status = 200, description = "Templates with this layout", body = TemplatesListResponse),
        (status = 400, description = "Malformed layout", body = ErrorResponse)
    )
)]
pub async fn get_by_layout(state: web::Data<AppState>, query: web::Query<LayoutQuery>) -> HttpResponse {
    let (aspect_ratio, cell_layout) = match query.layout() {
        Ok(layout) => layout,
        Err(response) => return response,
    };
    list_response(state.templates.by_layout(&aspect_ratio, &cell_layout))
}

/// POST /api/v1/templates/upload - Ingest a user template
#[utoipa::path(
    post,
    path = "/api/v1/templates/upload",
    tag = "templates",
    request_body = UploadTemplateRequest,
    responses(
        (status = 201, description = "Template stored", body = TemplateResponse),
        (status = 400, description = "Not a PNG or no usable holes", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn upload_template(state: web::Data<AppState>, body: web::Json<UploadTemplateRequest>) -> HttpResponse {
    let bytes = match decode_base64(&body.image) {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "INVALID_IMAGE", format!("invalid base64: {}", e)),
    };

    let library = state.templates.clone();
    match tokio::task::spawn_blocking(move || library.ingest(&bytes)).await {
        Ok(Ok(template)) => {
            info!(template_id = %template.metadata.id, "Template uploaded");
            HttpResponse::Created().json(TemplateResponse {
                success: true,
                data: TemplateInfo::from(template.as_ref()),
            })
        }
        Ok(Err(e)) => {
            error!(error = %e, "Template upload rejected");
            template_error(&e)
        }
        Err(e) => join_error(e),
    }
}

/// POST /api/v1/templates/generate - Generate a blank template
#[utoipa::path(
    post,
    path = "/api/v1/templates/generate",
    tag = "templates",
    request_body = GenerateTemplateRequest,
    responses(
        (status = 200, description = "Generated (or existing) template", body = TemplateResponse),
        (status = 400, description = "Malformed layout", body = ErrorResponse)
    )
)]
pub async fn generate_template(
    state: web::Data<AppState>,
    body: web::Json<GenerateTemplateRequest>,
) -> HttpResponse {
    let query = LayoutQuery {
        aspect_ratio: body.aspect_ratio.clone(),
        cell_layout: body.cell_layout.clone(),
    };
    let (aspect_ratio, cell_layout) = match query.layout() {
        Ok(layout) => layout,
        Err(response) => return response,
    };

    let library = state.templates.clone();
    let style = body.style;
    match tokio::task::spawn_blocking(move || library.generate(&aspect_ratio, &cell_layout, style)).await {
        Ok(Ok((template, created))) => {
            info!(template_id = %template.metadata.id, created, "Template generated");
            HttpResponse::Ok().json(TemplateResponse {
                success: true,
                data: TemplateInfo::from(template.as_ref()),
            })
        }
        Ok(Err(e)) => {
            error!(error = %e, "Template generation failed");
            template_error(&e)
        }
        Err(e) => join_error(e),
    }
}
