//! Service index

use actix_web::{web, HttpResponse};

use crate::AppState;

/// GET / - Quick-reference API documentation, public.
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": state.version.name,
        "version": state.version.version,
        "endpoints": {
            "/": "GET - API documentation",
            "/convert": "POST - Convert HTML to PDF (X-API-Key required)",
            "/health": "GET - Health check",
            "/version": "GET - API version and update info",
            "/admin/keys": "GET/POST/PATCH/DELETE - API key management (X-Super-User-Key required)",
            "/swagger-ui/": "GET - Interactive API documentation"
        },
        "usage": {
            "endpoint": "/convert",
            "method": "POST",
            "content-type": "application/json",
            "body": {
                "html": "HTML content as string (required)",
                "css": "Optional CSS styles, injected into the document head",
                "filename": "Optional output filename (default: document.pdf)",
                "base_url": "Optional base URL for resolving relative URLs",
                "page_size": "Optional: \"A4\" (default), \"Letter\", \"Legal\", \"A3\", or \"auto\"",
                "width": "Optional custom width (e.g. \"1200px\", \"21cm\")",
                "height": "Optional custom height (e.g. \"800px\", \"29.7cm\")",
                "margin": "Optional page margins (default: \"0\")",
                "viewport_width": "Optional browser viewport width in pixels (default: 1920)",
                "viewport_height": "Optional browser viewport height in pixels (default: 1080)"
            }
        }
    }))
}
