//! Request guard middleware
//!
//! Actix-web middleware that authenticates every protected route and applies
//! sliding-window rate limiting to ordinary keys. Admin routes are gated by
//! the super user key; the super user bypasses rate limiting (admin traffic
//! is operator-only and low-volume).

use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use tracing::{info, warn};

use super::auth::{client_ip, header_value, Caller, API_KEY_HEADER, SUPER_USER_HEADER};
use super::rate_limit::{
    append_rate_limit_headers, rate_limit_exceeded_response, RateDecision, RateLimiter,
};
use crate::store::{mask_secret, KeyStore, ResolvedKey};

/// Middleware factory for authentication and rate limiting.
pub struct ApiGuard {
    store: Arc<KeyStore>,
    limiter: Arc<RateLimiter>,
    /// Paths served without credentials.
    public_paths: Vec<String>,
}

impl ApiGuard {
    pub fn new(store: Arc<KeyStore>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            store,
            limiter,
            public_paths: vec![
                "/health".to_string(),
                "/version".to_string(),
                "/swagger-ui".to_string(),
                "/api-docs".to_string(),
            ],
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Transform = ApiGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiGuardService {
            service: Rc::new(service),
            store: self.store.clone(),
            limiter: self.limiter.clone(),
            public_paths: self.public_paths.clone(),
        })
    }
}

/// The actual guard service
pub struct ApiGuardService<S> {
    service: Rc<S>,
    store: Arc<KeyStore>,
    limiter: Arc<RateLimiter>,
    public_paths: Vec<String>,
}

impl<S> ApiGuardService<S> {
    fn is_public_path(&self, path: &str) -> bool {
        path == "/" || self.public_paths.iter().any(|p| path.starts_with(p))
    }
}

impl<S, B> Service<ServiceRequest> for ApiGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut core::task::Context<'_>,
    ) -> core::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let store = self.store.clone();
        let limiter = self.limiter.clone();
        let path = req.path().to_string();
        let is_public = self.is_public_path(&path);
        let is_admin = path.starts_with("/admin");

        Box::pin(async move {
            if is_public {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            if is_admin {
                return admin_gate(req, service, &store).await;
            }

            // Ordinary protected route: X-API-Key, then rate limiting.
            let secret = match header_value(&req, API_KEY_HEADER) {
                Some(secret) => secret,
                None => {
                    warn!(ip = ?client_ip(&req), %path, "Request missing X-API-Key header");
                    let response = HttpResponse::Unauthorized().json(serde_json::json!({
                        "error": "Authentication required",
                        "message": "Please provide X-API-Key header"
                    }));
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            let key = match store.find_by_secret(&secret) {
                Some(ResolvedKey::SuperUser { name }) => {
                    // Admin credential on a data route: allowed, not rate limited.
                    info!(caller = %name, %path, "Super user request");
                    req.extensions_mut().insert(Caller::SuperUser { name });
                    let res = service.call(req).await?;
                    return Ok(res.map_into_left_body());
                }
                Some(ResolvedKey::Api(key)) if key.active => key,
                _ => {
                    warn!(
                        ip = ?client_ip(&req),
                        key_preview = %mask_secret(&secret),
                        "Invalid or inactive API key"
                    );
                    let response = HttpResponse::Forbidden().json(serde_json::json!({
                        "error": "Invalid API key",
                        "message": "The provided API key is not valid"
                    }));
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            let status = match limiter.check_and_record(&key.key) {
                RateDecision::Denied {
                    retry_after_seconds,
                    message,
                } => {
                    warn!(
                        key_preview = %mask_secret(&key.key),
                        retry_after_seconds,
                        "Rate limit exceeded"
                    );
                    let response = rate_limit_exceeded_response(
                        limiter.limits().requests_per_minute,
                        retry_after_seconds,
                        &message,
                    );
                    return Ok(req.into_response(response).map_into_right_body());
                }
                RateDecision::Allowed(status) => status,
            };

            req.extensions_mut().insert(Caller::Key {
                name: key.name.clone(),
                key_preview: mask_secret(&key.key),
            });

            let res = service.call(req).await?;
            let mut res = res.map_into_left_body();
            append_rate_limit_headers(res.headers_mut(), &status);
            Ok(res)
        })
    }
}

async fn admin_gate<S, B>(
    req: ServiceRequest,
    service: Rc<S>,
    store: &KeyStore,
) -> Result<ServiceResponse<EitherBody<B, BoxBody>>, Error>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    let secret = match header_value(&req, SUPER_USER_HEADER) {
        Some(secret) => secret,
        None => {
            warn!(ip = ?client_ip(&req), "Admin request missing X-Super-User-Key header");
            let response = HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "Admin authentication required",
                "message": "Please provide X-Super-User-Key header"
            }));
            return Ok(req.into_response(response).map_into_right_body());
        }
    };

    match store.find_by_secret(&secret) {
        Some(ResolvedKey::SuperUser { name }) => {
            info!(caller = %name, "Super user authenticated");
            req.extensions_mut().insert(Caller::SuperUser { name });
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        }
        Some(ResolvedKey::Api(_)) => {
            // A valid ordinary key never gains admin capability.
            warn!(ip = ?client_ip(&req), "Ordinary API key used on admin endpoint");
            let response = HttpResponse::Forbidden().json(serde_json::json!({
                "error": "Insufficient privilege",
                "message": "API keys cannot access admin endpoints"
            }));
            Ok(req.into_response(response).map_into_right_body())
        }
        None => {
            warn!(ip = ?client_ip(&req), "Invalid super user key");
            let response = HttpResponse::Forbidden().json(serde_json::json!({
                "error": "Invalid super user key",
                "message": "The provided super user key is not valid"
            }));
            Ok(req.into_response(response).map_into_right_body())
        }
    }
}
