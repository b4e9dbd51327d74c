//! Version endpoint backed by an optional version.json manifest
//!
//! Deployments drop a `version.json` next to the binary to surface release
//! notes; without one the endpoint falls back to the built-in crate version.

use std::path::Path;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::AppState;

/// Release metadata served by /version.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VersionInfo {
    pub version: String,
    pub name: String,
    pub updated_at: String,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub changelog: Vec<serde_json::Value>,
}

impl VersionInfo {
    /// Read the manifest, falling back to built-in values when it is absent
    /// or unreadable. A bad manifest never prevents startup.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::fallback();
        };
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Malformed version manifest");
                Self::fallback()
            }),
            Err(_) => Self::fallback(),
        }
    }

    fn fallback() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            name: "PDFSmith".to_string(),
            updated_at: String::new(),
            changelog: Vec::new(),
        }
    }
}

/// GET /version - API version and update info, public.
#[utoipa::path(
    get,
    path = "/version",
    tag = "system",
    responses(
        (status = 200, description = "Current version and changelog", body = VersionInfo)
    )
)]
pub async fn version_info(state: web::Data<AppState>) -> HttpResponse {
    let info = &state.version;
    HttpResponse::Ok().json(serde_json::json!({
        "version": info.version,
        "name": info.name,
        "updated_at": info.updated_at,
        "changelog": info.changelog,
        "timestamp": Utc::now(),
    }))
}
