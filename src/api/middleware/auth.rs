//! Credential extraction and caller identity
//!
//! Ordinary callers authenticate with the X-API-Key header, admin callers
//! with X-Super-User-Key. Header names are case-insensitive; values are
//! compared byte-exact against the store.

use std::net::IpAddr;

use actix_web::dev::ServiceRequest;
use actix_web::HttpMessage;

/// Header carrying an ordinary API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Header carrying the super user key for admin endpoints.
pub const SUPER_USER_HEADER: &str = "X-Super-User-Key";

/// Identity attached to request extensions after authentication.
#[derive(Debug, Clone)]
pub enum Caller {
    SuperUser { name: String },
    Key { name: String, key_preview: String },
}

impl Caller {
    pub fn is_super_user(&self) -> bool {
        matches!(self, Caller::SuperUser { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            Caller::SuperUser { name } => name,
            Caller::Key { name, .. } => name,
        }
    }
}

/// Read a credential header. Header name lookup is case-insensitive.
pub fn header_value(req: &ServiceRequest, header: &str) -> Option<String> {
    req.headers()
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Client IP for auth logs, preferring proxy headers.
pub fn client_ip(req: &ServiceRequest) -> Option<IpAddr> {
    if let Some(forwarded) = req.headers().get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first) = forwarded_str.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }
    req.peer_addr().map(|addr| addr.ip())
}

/// Trait for reading the authenticated caller from request extensions.
pub trait CallerExt {
    fn caller(&self) -> Option<Caller>;
}

impl<T: HttpMessage> CallerExt for T {
    fn caller(&self) -> Option<Caller> {
        self.extensions().get::<Caller>().cloned()
    }
}
