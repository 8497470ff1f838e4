//! API module - HTTP routes and handlers

pub mod handlers;
pub mod openapi;

use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;

/// Configure all API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/compose", web::post().to(handlers::compose::compose_image))
            .route("/filters/apply", web::post().to(handlers::filters::apply_filter_preview))
            .service(
                web::scope("/templates")
                    // Fixed segments before {template_id}
                    .route("/by-layout", web::get().to(handlers::templates::get_by_layout))
                    .route("/upload", web::post().to(handlers::templates::upload_template))
                    .route("/generate", web::post().to(handlers::templates::generate_template))
                    .route("", web::get().to(handlers::templates::list_templates))
                    .route("/{template_id}", web::get().to(handlers::templates::get_template))
                    .route("/{template_id}/image", web::get().to(handlers::templates::get_template_image)),
            )
            .service(
                web::scope("/layouts")
                    .route("/thumbnail", web::get().to(handlers::layouts::layout_thumbnail))
                    .route("", web::get().to(handlers::layouts::list_layouts)),
            )
            .route("/fonts", web::get().to(handlers::assets::list_fonts)),
    )
    .route("/health", web::get().to(handlers::health::health_check))
    .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image::{Rgb, RgbImage};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Instant;

    use r_photobooth::config::Settings;
    use r_photobooth::domain::{AspectRatio, CellLayout};
    use r_photobooth::engine::{FontLibrary, Raster, StickerLibrary, StylePreset, TemplateLibrary};

    use crate::AppState;

    /// State with a single generated 2:3 1x1 template
    fn state(root: &std::path::Path) -> (web::Data<AppState>, String) {
        let templates = Arc::new(TemplateLibrary::new(root.join("uploads"), root.join("generated")));
        let aspect = "2:3".parse::<AspectRatio>().unwrap();
        let layout = "1x1".parse::<CellLayout>().unwrap();
        let (template, _) = templates.generate(&aspect, &layout, StylePreset::A).unwrap();

        let state = web::Data::new(AppState {
            settings: Settings::default(),
            templates,
            fonts: Arc::new(FontLibrary::new(root.join("fonts"))),
            stickers: Arc::new(StickerLibrary::new(root.join("stickers"))),
            started_at: Instant::now(),
        });
        (state, template.metadata.id.clone())
    }

    fn photo_base64() -> String {
        let png = Raster::Rgb(RgbImage::from_pixel(20, 30, Rgb([10, 120, 200]))).encode_png().unwrap();
        STANDARD.encode(png)
    }

    #[actix_rt::test]
    async fn test_health_reports_loaded_templates() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state(dir.path());
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["templates_loaded"], 1);
        assert_eq!(body["layouts_available"], 1);
    }

    #[actix_rt::test]
    async fn test_template_lookup_routes() {
        let dir = tempfile::tempdir().unwrap();
        let (state, id) = state(dir.path());
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/templates/by-layout?aspect_ratio=2:3&cell_layout=1x1")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["id"], id.as_str());

        let req = test::TestRequest::get()
            .uri("/api/v1/templates/by-layout?aspect_ratio=wide&cell_layout=1x1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/v1/templates/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri(&format!("/api/v1/templates/{}/image", id)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
    }

    #[actix_rt::test]
    async fn test_compose_route() {
        let dir = tempfile::tempdir().unwrap();
        let (state, id) = state(dir.path());
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/compose")
            .set_json(json!({
                "template_id": id,
                "photos": [{ "data": photo_base64() }]
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["metadata"]["photos_drawn"], 1);
        assert!(body["image"].as_str().unwrap().starts_with("data:image/png;base64,"));

        let req = test::TestRequest::post()
            .uri("/api/v1/compose")
            .set_json(json!({
                "template_id": id,
                "photos": [{ "data": photo_base64() }, { "data": photo_base64() }]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "SIZE_MISMATCH");
    }

    #[actix_rt::test]
    async fn test_layout_routes() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state(dir.path());
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/layouts").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["cell_layout"], "1x1");
        assert_eq!(body["data"][0]["template_count"], 1);

        let req = test::TestRequest::get()
            .uri("/api/v1/layouts/thumbnail?aspect_ratio=4:3&cell_layout=2x2")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");

        let req = test::TestRequest::get()
            .uri("/api/v1/layouts/thumbnail?aspect_ratio=4:3&cell_layout=10000000x1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "INVALID_LAYOUT");
    }

    #[actix_rt::test]
    async fn test_generate_refuses_oversized_layout() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state(dir.path());
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/templates/generate")
            .set_json(json!({ "aspect_ratio": "4:3", "cell_layout": "10000000x1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "INVALID_LAYOUT");
    }
}
