//! R-Photobooth
//!
//! Photo strip compositing service using Rust + Actix-Web.
//! Templates are PNGs whose transparent regions become photo holes.

use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_actix_web::TracingLogger;

mod api;

use r_photobooth::config::Settings;
use r_photobooth::engine::{FontLibrary, StickerLibrary, TemplateLibrary};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub templates: Arc<TemplateLibrary>,
    pub fonts: Arc<FontLibrary>,
    pub stickers: Arc<StickerLibrary>,
    pub started_at: Instant,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("r_photobooth=info".parse()?)
                .add_directive("actix_web=info".parse()?),
        )
        .json()
        .init();

    let settings = Settings::load()?;
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    info!("Starting R-Photobooth v{} on {}", env!("CARGO_PKG_VERSION"), bind_addr);

    let templates = Arc::new(TemplateLibrary::new(
        settings.templates.path.clone(),
        settings.templates.generated_path.clone(),
    ));
    let loaded = templates.load_all().await?;
    info!("Loaded {} templates", loaded);

    // Every default layout needs a generated template on disk
    let library = templates.clone();
    let generated = tokio::task::spawn_blocking(move || library.ensure_defaults()).await??;
    if generated > 0 {
        info!("Generated {} default templates", generated);
    }

    let fonts = Arc::new(FontLibrary::new(settings.assets.fonts_path.clone()));
    let stickers = Arc::new(StickerLibrary::new(settings.assets.stickers_path.clone()));
    info!(
        fonts = %fonts.root().display(),
        stickers = %stickers.root().display(),
        "Asset libraries ready"
    );

    let workers = settings.server.workers.unwrap_or_else(num_cpus::get);
    let max_payload = settings.server.max_payload_bytes;

    let app_state = web::Data::new(AppState {
        settings,
        templates,
        fonts,
        stickers,
        started_at: Instant::now(),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(max_payload))
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "r-photobooth"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION"))),
            )
            .configure(api::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
