//! Admin API key management endpoints
//!
//! CRUD over the key store, super user only. Existing keys are addressed by
//! secret prefix so management never re-exposes a full secret; the guard
//! middleware authenticates, handlers re-check the caller before mutating.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{error, info};

use crate::api::middleware::{Caller, CallerExt};
use crate::store::{KeyStore, KeyUpdate, StoreError};

/// Request to create a new API key
#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateKeyRequest {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
}

fn require_super_user(req: &HttpRequest) -> Result<Caller, HttpResponse> {
    match req.caller() {
        Some(caller) if caller.is_super_user() => Ok(caller),
        Some(_) => Err(HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Insufficient privilege",
            "message": "Super user key required"
        }))),
        None => Err(HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "Admin authentication required",
            "message": "Please provide X-Super-User-Key header"
        }))),
    }
}

/// List all API keys, masked.
/// GET /admin/keys
pub async fn list_keys(req: HttpRequest, store: web::Data<KeyStore>) -> HttpResponse {
    if let Err(response) = require_super_user(&req) {
        return response;
    }

    let (keys, rate_limit) = store.list_keys();
    let total = keys.len();
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "keys": keys,
        "total": total,
        "rate_limit": rate_limit
    }))
}

/// Create a new API key. The full secret appears in this response and
/// nowhere else, ever again.
/// POST /admin/keys
pub async fn create_key(
    req: HttpRequest,
    store: web::Data<KeyStore>,
    body: web::Json<CreateKeyRequest>,
) -> HttpResponse {
    let caller = match require_super_user(&req) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    let name = body.name.trim();
    if name.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Key name is required"
        }));
    }

    match store.create_key(name, body.active) {
        Ok(key) => {
            info!(name = %key.name, created_by = %caller.name(), "API key issued");
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "message": "API key created successfully",
                "key": key.key,
                "name": key.name,
                "created": key.created,
                "active": key.active,
                "warning": "Save this key securely. It will not be shown again in full."
            }))
        }
        Err(e) => store_error_response(e),
    }
}

/// Update an API key (activate/deactivate or rename) by secret prefix.
/// PATCH /admin/keys/{prefix}
pub async fn update_key(
    req: HttpRequest,
    store: web::Data<KeyStore>,
    path: web::Path<String>,
    body: web::Json<UpdateKeyRequest>,
) -> HttpResponse {
    let caller = match require_super_user(&req) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    let update = KeyUpdate {
        active: body.active,
        name: body.name.clone(),
    };
    if update.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Request body required",
            "message": "Provide at least one of: active, name"
        }));
    }

    match store.update_key(&path, update) {
        Ok(key) => {
            info!(name = %key.name, updated_by = %caller.name(), "API key updated");
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "API key updated successfully",
                "key": key
            }))
        }
        Err(e) => store_error_response(e),
    }
}

/// Delete an API key permanently by secret prefix.
/// DELETE /admin/keys/{prefix}
pub async fn delete_key(
    req: HttpRequest,
    store: web::Data<KeyStore>,
    path: web::Path<String>,
) -> HttpResponse {
    let caller = match require_super_user(&req) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match store.delete_key(&path) {
        Ok(key) => {
            info!(name = %key.name, deleted_by = %caller.name(), "API key deleted");
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "API key deleted successfully"
            }))
        }
        Err(e) => store_error_response(e),
    }
}

fn store_error_response(e: StoreError) -> HttpResponse {
    match e {
        StoreError::KeyNotFound(prefix) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("No key found with prefix: {prefix}")
        })),
        StoreError::AmbiguousPrefix { prefix, count } => {
            HttpResponse::Conflict().json(serde_json::json!({
                "error": "Ambiguous key prefix",
                "message": format!("prefix '{prefix}' matches {count} keys, use a longer prefix")
            }))
        }
        other => {
            error!(error = %other, "Key store mutation failed");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to persist key store",
                "message": "The change was not applied"
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::{ApiGuard, RateLimiter, API_KEY_HEADER, SUPER_USER_HEADER};
    use crate::store::{ApiKey, RateLimitSettings, StoreFile, SuperUser};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use chrono::NaiveDate;
    use std::sync::Arc;

    const SUPER_KEY: &str = "admin-super-key-00000000000000000";
    const CLIENT_KEY: &str = "admin-client-key-aaaaaaaaaaaaaaaa";

    fn seeded_store() -> (Arc<KeyStore>, std::path::PathBuf) {
        let created = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let file = StoreFile {
            super_user: SuperUser {
                key: SUPER_KEY.to_string(),
                name: "Operator".to_string(),
                created,
            },
            api_keys: vec![ApiKey {
                key: CLIENT_KEY.to_string(),
                name: "Client".to_string(),
                created,
                active: true,
            }],
            rate_limit: RateLimitSettings {
                requests_per_minute: 60,
                requests_per_hour: 1000,
            },
        };
        let path =
            std::env::temp_dir().join(format!("pdfsmith-admin-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, serde_json::to_string_pretty(&file).unwrap()).unwrap();
        (Arc::new(KeyStore::open(&path).unwrap()), path)
    }

    async fn ok_handler() -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({"ok": true}))
    }

    macro_rules! admin_app {
        ($store:expr) => {{
            let limiter = Arc::new(RateLimiter::new($store.rate_limit()));
            test::init_service(
                App::new()
                    .app_data(web::Data::from($store.clone()))
                    .wrap(ApiGuard::new($store.clone(), limiter))
                    .route("/convert", web::post().to(ok_handler))
                    .service(
                        web::scope("/admin").service(
                            web::scope("/keys")
                                .route("", web::get().to(list_keys))
                                .route("", web::post().to(create_key))
                                .route("/{prefix}", web::patch().to(update_key))
                                .route("/{prefix}", web::delete().to(delete_key)),
                        ),
                    ),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn test_create_then_list_shows_masked_key() {
        let (store, path) = seeded_store();
        let app = admin_app!(store);

        let req = test::TestRequest::post()
            .uri("/admin/keys")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .set_json(serde_json::json!({"name": "New Client"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: serde_json::Value = test::read_body_json(res).await;
        let secret = created["key"].as_str().unwrap().to_string();
        assert!(secret.len() >= 43);
        assert_eq!(created["active"], serde_json::json!(true));
        assert!(created["warning"].as_str().unwrap().contains("not be shown again"));

        let req = test::TestRequest::get()
            .uri("/admin/keys")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let listed: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(listed["total"], serde_json::json!(2));
        assert_eq!(listed["rate_limit"]["requests_per_minute"], serde_json::json!(60));
        // The full secret never appears in a listing.
        let body = listed.to_string();
        assert!(!body.contains(&secret));
        assert!(body.contains("..."));
        std::fs::remove_file(&path).ok();
    }

    #[actix_web::test]
    async fn test_created_key_authenticates_until_deactivated() {
        let (store, path) = seeded_store();
        let app = admin_app!(store);

        let req = test::TestRequest::post()
            .uri("/admin/keys")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .set_json(serde_json::json!({"name": "Roundtrip"}))
            .to_request();
        let created: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        let secret = created["key"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header((API_KEY_HEADER, secret.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let prefix = &secret[..12];
        let req = test::TestRequest::patch()
            .uri(&format!("/admin/keys/{prefix}"))
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .set_json(serde_json::json!({"active": false}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header((API_KEY_HEADER, secret))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );
        std::fs::remove_file(&path).ok();
    }

    #[actix_web::test]
    async fn test_create_requires_name() {
        let (store, path) = seeded_store();
        let app = admin_app!(store);

        let req = test::TestRequest::post()
            .uri("/admin/keys")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .set_json(serde_json::json!({"name": "  "}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
        std::fs::remove_file(&path).ok();
    }

    #[actix_web::test]
    async fn test_update_unknown_prefix_is_404() {
        let (store, path) = seeded_store();
        let app = admin_app!(store);

        let req = test::TestRequest::patch()
            .uri("/admin/keys/zzzz")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .set_json(serde_json::json!({"active": false}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
        std::fs::remove_file(&path).ok();
    }

    #[actix_web::test]
    async fn test_update_with_empty_body_is_400() {
        let (store, path) = seeded_store();
        let app = admin_app!(store);

        let req = test::TestRequest::patch()
            .uri("/admin/keys/admin-client")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .set_json(serde_json::json!({}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
        std::fs::remove_file(&path).ok();
    }

    #[actix_web::test]
    async fn test_ambiguous_prefix_is_conflict() {
        let created = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let file = StoreFile {
            super_user: SuperUser {
                key: SUPER_KEY.to_string(),
                name: "Operator".to_string(),
                created,
            },
            api_keys: vec![
                ApiKey {
                    key: "shared-prefix-key-one-1111111111".to_string(),
                    name: "One".to_string(),
                    created,
                    active: true,
                },
                ApiKey {
                    key: "shared-prefix-key-two-2222222222".to_string(),
                    name: "Two".to_string(),
                    created,
                    active: true,
                },
            ],
            rate_limit: RateLimitSettings {
                requests_per_minute: 60,
                requests_per_hour: 1000,
            },
        };
        let path =
            std::env::temp_dir().join(format!("pdfsmith-admin-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, serde_json::to_string_pretty(&file).unwrap()).unwrap();
        let store = Arc::new(KeyStore::open(&path).unwrap());
        let app = admin_app!(store);

        let req = test::TestRequest::delete()
            .uri("/admin/keys/shared-prefix")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CONFLICT
        );

        // A longer, unique prefix disambiguates.
        let req = test::TestRequest::delete()
            .uri("/admin/keys/shared-prefix-key-one")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        std::fs::remove_file(&path).ok();
    }

    #[actix_web::test]
    async fn test_delete_twice_reports_not_found() {
        let (store, path) = seeded_store();
        let app = admin_app!(store);

        let req = test::TestRequest::delete()
            .uri("/admin/keys/admin-client")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri("/admin/keys/admin-client")
            .insert_header((SUPER_USER_HEADER, SUPER_KEY))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
        std::fs::remove_file(&path).ok();
    }
}
