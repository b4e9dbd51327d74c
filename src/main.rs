//! PDFSmith
//!
//! HTML to PDF conversion API using Rust + Actix-Web + headless Chromium.
//! Renders documents exactly like a browser, gated by API key authentication
//! and per-key sliding-window rate limiting.

use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

mod api;
mod config;
mod renderer;
mod store;

use crate::api::handlers::version::VersionInfo;
use crate::api::middleware::{ApiGuard, RateLimiter};
use crate::config::Settings;
use crate::renderer::{ChromiumRenderer, PdfRenderer};
use crate::store::KeyStore;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub version: VersionInfo,
    pub renderer: Arc<dyn PdfRenderer>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pdfsmith=info".parse().unwrap())
                .add_directive("actix_web=info".parse().unwrap()),
        )
        .json()
        .init();

    // Load configuration
    let settings = Settings::load().expect("Failed to load configuration");
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    info!(
        "Starting PDFSmith v{} on {}",
        env!("CARGO_PKG_VERSION"),
        bind_addr
    );

    let version = VersionInfo::load(settings.version_file.as_deref());

    // An absent or malformed key store would disable authentication, so it is
    // fatal rather than degraded.
    let store = match KeyStore::open(&settings.keys.path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(
                path = %settings.keys.path.display(),
                error = %e,
                "Failed to load key store"
            );
            std::process::exit(1);
        }
    };

    // Rate limit state is per-process: with multiple worker processes each
    // enforces its own ceiling, so provision limits accordingly.
    let limiter = Arc::new(RateLimiter::new(store.rate_limit()));
    let rate = limiter.limits();
    info!(
        requests_per_minute = rate.requests_per_minute,
        requests_per_hour = rate.requests_per_hour,
        "Rate limiter initialized"
    );

    let chromium: Arc<dyn PdfRenderer> = Arc::new(ChromiumRenderer::new(&settings.renderer));

    let max_payload = settings.server.max_payload_bytes;
    let workers = settings.server.workers.unwrap_or_else(|| num_cpus::get() * 2);

    let app_state = web::Data::new(AppState {
        settings: settings.clone(),
        version,
        renderer: chromium,
    });
    let store_data = web::Data::from(store.clone());

    // Configure and start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(store_data.clone())
            .app_data(web::JsonConfig::default().limit(max_payload))
            // Authentication and rate limiting for protected routes
            .wrap(ApiGuard::new(store.clone(), limiter.clone()))
            // Middleware (order matters - these wrap around ApiGuard)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "pdfsmith"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION"))),
            )
            // Routes
            .configure(api::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
