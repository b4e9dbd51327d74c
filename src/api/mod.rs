//! API module - HTTP routes and handlers

pub mod handlers;
pub mod middleware;
pub mod openapi;

use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;

/// Configure all API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::home::index))
        .route("/health", web::get().to(handlers::health::health_check))
        .route("/version", web::get().to(handlers::version::version_info))
        .route("/convert", web::post().to(handlers::convert::convert_html))
        // API key management, super user only
        .service(
            web::scope("/admin").service(
                web::scope("/keys")
                    .route("", web::get().to(handlers::admin_keys::list_keys))
                    .route("", web::post().to(handlers::admin_keys::create_key))
                    .route("/{prefix}", web::patch().to(handlers::admin_keys::update_key))
                    .route("/{prefix}", web::delete().to(handlers::admin_keys::delete_key)),
            ),
        )
        // Swagger UI and OpenAPI spec
        .service(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
}
