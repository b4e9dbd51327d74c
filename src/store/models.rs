//! Persisted key store document model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single client API key as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKey {
    /// The bearer secret. Exposed in full only once, at creation time.
    pub key: String,
    pub name: String,
    pub created: NaiveDate,
    pub active: bool,
}

/// The single privileged credential allowed to manage API keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuperUser {
    pub key: String,
    pub name: String,
    pub created: NaiveDate,
}

/// Sliding-window ceilings applied to every ordinary key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSettings {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
}

/// The full on-disk document. Unknown or missing fields are rejected at load
/// time rather than tolerated silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreFile {
    pub super_user: SuperUser,
    pub api_keys: Vec<ApiKey>,
    pub rate_limit: RateLimitSettings,
}

/// Masked view of a stored key, safe for list responses and logs.
#[derive(Debug, Clone, Serialize)]
pub struct MaskedKey {
    pub name: String,
    pub key_preview: String,
    pub created: NaiveDate,
    pub active: bool,
}

impl MaskedKey {
    pub fn from_key(key: &ApiKey) -> Self {
        Self {
            name: key.name.clone(),
            key_preview: mask_secret(&key.key),
            created: key.created,
            active: key.active,
        }
    }
}

/// Shorten a secret to a displayable preview (first 8 + last 4 characters).
pub fn mask_secret(secret: &str) -> String {
    match (secret.get(..8), secret.get(secret.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if secret.len() >= 16 => format!("{head}...{tail}"),
        _ => "****".to_string(),
    }
}
