//! HTML to PDF conversion endpoint

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::renderer::{RenderError, RenderOptions};
use crate::AppState;

/// Request body for a conversion
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertRequest {
    /// HTML content to render. Malformed markup is fine, the browser copes.
    pub html: String,
    /// CSS injected into the document head.
    #[serde(default)]
    pub css: Option<String>,
    /// Output filename for the Content-Disposition header.
    #[serde(default)]
    pub filename: Option<String>,
    /// Base URL for resolving relative URLs in the document.
    #[serde(default)]
    pub base_url: Option<String>,
    /// "A4" (default), "Letter", "Legal", "A3", "A5", "Tabloid", or "auto".
    #[serde(default = "default_page_size")]
    pub page_size: String,
    /// Custom page width, e.g. "1200px" or "21cm".
    #[serde(default)]
    pub width: Option<String>,
    /// Custom page height, e.g. "800px" or "29.7cm".
    #[serde(default)]
    pub height: Option<String>,
    /// Uniform page margin, e.g. "10mm". Defaults to none.
    #[serde(default)]
    pub margin: Option<String>,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

fn default_page_size() -> String {
    "A4".to_string()
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

/// POST /convert - Convert HTML to PDF
///
/// Authenticated and rate limited by the request guard.
#[utoipa::path(
    post,
    path = "/convert",
    tag = "convert",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf"),
        (status = 400, description = "Missing HTML or invalid options"),
        (status = 401, description = "Missing API key"),
        (status = 403, description = "Invalid or inactive API key"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Rendering failed")
    )
)]
pub async fn convert_html(
    state: web::Data<AppState>,
    body: web::Json<ConvertRequest>,
) -> HttpResponse {
    if body.html.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "HTML content is required"
        }));
    }

    let options = match RenderOptions::from_request(
        &body.page_size,
        body.width.as_deref(),
        body.height.as_deref(),
        body.margin.as_deref(),
        (body.viewport_width, body.viewport_height),
    ) {
        Ok(options) => options,
        Err(e) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid conversion options",
                "message": e.to_string()
            }));
        }
    };

    let filename = normalize_filename(body.filename.as_deref());
    let document = compose_document(&body.html, body.css.as_deref(), body.base_url.as_deref());

    info!(
        filename = %filename,
        page_size = %body.page_size,
        input_bytes = document.len(),
        "Converting HTML to PDF"
    );

    match state.renderer.render(&document, &options).await {
        Ok(pdf) => {
            info!(filename = %filename, output_bytes = pdf.len(), "PDF generated");
            HttpResponse::Ok()
                .content_type("application/pdf")
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ))
                .body(pdf)
        }
        Err(e) => {
            error!(error = %e, filename = %filename, "HTML to PDF conversion failed");
            let message = match &e {
                RenderError::Timeout(secs) => {
                    format!("Rendering did not finish within {secs} seconds")
                }
                _ => "The rendering engine could not process the document".to_string(),
            };
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to convert HTML to PDF",
                "message": message
            }))
        }
    }
}

/// Default to document.pdf, force a .pdf suffix, keep the header parseable.
fn normalize_filename(raw: Option<&str>) -> String {
    let mut name = raw
        .map(|n| n.replace(['"', '\\'], "_"))
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "document.pdf".to_string());
    if !name.ends_with(".pdf") {
        name.push_str(".pdf");
    }
    name
}

/// Inject optional CSS and base URL into the document head. Documents
/// without a head are wrapped in a minimal skeleton.
fn compose_document(html: &str, css: Option<&str>, base_url: Option<&str>) -> String {
    let mut inserts = String::new();
    if let Some(base) = base_url {
        inserts.push_str(&format!("<base href=\"{base}\">"));
    }
    if let Some(css) = css.filter(|c| !c.trim().is_empty()) {
        inserts.push_str(&format!("<style>{css}</style>"));
    }
    if inserts.is_empty() {
        return html.to_string();
    }

    for tag in ["</head>", "</HEAD>"] {
        if let Some(pos) = html.find(tag) {
            let mut out = String::with_capacity(html.len() + inserts.len());
            out.push_str(&html[..pos]);
            out.push_str(&inserts);
            out.push_str(&html[pos..]);
            return out;
        }
    }

    format!("<!DOCTYPE html><html><head>{inserts}</head><body>{html}</body></html>")
}
