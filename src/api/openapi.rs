//! OpenAPI 3.0 document

use utoipa::OpenApi;

use crate::api::handlers::{
    assets::FontsResponse,
    compose::{ComposeMetadata, ComposeRequest, ComposeResponse, PhotoPayload},
    filters::{FilterRequest, FilterResponse},
    health::HealthResponse,
    layouts::{LayoutInfo, LayoutsResponse},
    templates::{GenerateTemplateRequest, TemplateInfo, TemplateResponse, TemplatesListResponse, UploadTemplateRequest},
    ApiError, Dimensions, ErrorResponse,
};
use r_photobooth::domain::{FilterSettings, Hole, Justify, Placement, StickerPlacement, TextBlock, Transform};
use r_photobooth::engine::StylePreset;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "R-Photobooth API",
        version = "1.0.0",
        description = "Photo strip compositing: templates with transparent holes, photos, stickers and captions"
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "Service health"),
        (name = "compose", description = "Photo strip composition and filter previews"),
        (name = "templates", description = "Template library"),
        (name = "layouts", description = "Layouts and thumbnails"),
        (name = "assets", description = "Fonts and stickers")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::compose::compose_image,
        crate::api::handlers::filters::apply_filter_preview,
        crate::api::handlers::templates::list_templates,
        crate::api::handlers::templates::get_template,
        crate::api::handlers::templates::get_template_image,
        crate::api::handlers::templates::get_by_layout,
        crate::api::handlers::templates::upload_template,
        crate::api::handlers::templates::generate_template,
        crate::api::handlers::layouts::list_layouts,
        crate::api::handlers::layouts::layout_thumbnail,
        crate::api::handlers::assets::list_fonts,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            ApiError,
            Dimensions,
            ComposeRequest,
            ComposeResponse,
            ComposeMetadata,
            PhotoPayload,
            FilterRequest,
            FilterResponse,
            TemplateInfo,
            TemplatesListResponse,
            TemplateResponse,
            UploadTemplateRequest,
            GenerateTemplateRequest,
            LayoutInfo,
            LayoutsResponse,
            FontsResponse,
            Transform,
            Placement,
            StickerPlacement,
            TextBlock,
            Justify,
            FilterSettings,
            Hole,
            StylePreset,
        )
    )
)]
pub struct ApiDoc;
