//! JSON-file backed credential store
//!
//! Single source of truth for API keys, the super user key, and rate limit
//! configuration. Mutations hold an exclusive lock across the whole
//! read-mutate-persist sequence and write atomically (temp file + rename),
//! so concurrent admin calls cannot produce a lost update and a crash
//! mid-write cannot truncate the store.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use parking_lot::RwLock;
use rand::RngCore;
use thiserror::Error;
use tracing::{info, warn};

use super::models::{ApiKey, MaskedKey, RateLimitSettings, StoreFile};

/// Key store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("key store is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid key store configuration: {0}")]
    InvalidConfig(String),
    #[error("no key found with prefix: {0}")]
    KeyNotFound(String),
    #[error("prefix '{prefix}' matches {count} keys, use a longer prefix")]
    AmbiguousPrefix { prefix: String, count: usize },
}

/// A credential resolved by exact secret match.
#[derive(Debug, Clone)]
pub enum ResolvedKey {
    SuperUser { name: String },
    Api(ApiKey),
}

/// Fields an admin may change on an existing key.
#[derive(Debug, Clone, Default)]
pub struct KeyUpdate {
    pub active: Option<bool>,
    pub name: Option<String>,
}

impl KeyUpdate {
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.name.is_none()
    }
}

/// In-memory key store bound to its backing file.
pub struct KeyStore {
    path: PathBuf,
    state: RwLock<StoreFile>,
}

impl KeyStore {
    /// Load the store from disk. An absent or malformed file is fatal: falling
    /// back to an empty store would disable authentication entirely.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let raw = fs::read_to_string(&path)?;
        let file: StoreFile = serde_json::from_str(&raw)?;
        Self::validate(&file)?;

        info!(
            path = %path.display(),
            keys = file.api_keys.len(),
            super_user = %file.super_user.name,
            "Key store loaded"
        );

        Ok(Self {
            path,
            state: RwLock::new(file),
        })
    }

    fn validate(file: &StoreFile) -> Result<(), StoreError> {
        let limits = &file.rate_limit;
        if limits.requests_per_minute == 0 || limits.requests_per_hour == 0 {
            return Err(StoreError::InvalidConfig(
                "rate limit ceilings must be positive".to_string(),
            ));
        }
        if limits.requests_per_minute > limits.requests_per_hour {
            // Operator responsibility: not rejected, but the hourly ceiling is
            // unreachable in this configuration.
            warn!(
                requests_per_minute = limits.requests_per_minute,
                requests_per_hour = limits.requests_per_hour,
                "Per-minute ceiling exceeds per-hour ceiling"
            );
        }

        let mut seen = std::collections::HashSet::new();
        seen.insert(file.super_user.key.as_str());
        for key in &file.api_keys {
            if !seen.insert(key.key.as_str()) {
                return Err(StoreError::InvalidConfig(format!(
                    "duplicate secret for key '{}'",
                    key.name
                )));
            }
        }
        Ok(())
    }

    /// Exact, case-sensitive secret lookup. Inactive keys still resolve so the
    /// caller can distinguish "unknown" from "revoked".
    pub fn find_by_secret(&self, secret: &str) -> Option<ResolvedKey> {
        let state = self.state.read();
        if state.super_user.key == secret {
            return Some(ResolvedKey::SuperUser {
                name: state.super_user.name.clone(),
            });
        }
        state
            .api_keys
            .iter()
            .find(|k| k.key == secret)
            .cloned()
            .map(ResolvedKey::Api)
    }

    pub fn rate_limit(&self) -> RateLimitSettings {
        self.state.read().rate_limit
    }

    /// Masked listing for the admin surface. Secrets are never returned in
    /// full here, only at creation time.
    pub fn list_keys(&self) -> (Vec<MaskedKey>, RateLimitSettings) {
        let state = self.state.read();
        let keys = state.api_keys.iter().map(MaskedKey::from_key).collect();
        (keys, state.rate_limit)
    }

    /// Create a key with a fresh random secret and persist the store.
    /// Returns the full key; this is the only moment the secret is exposed.
    pub fn create_key(&self, name: &str, active: bool) -> Result<ApiKey, StoreError> {
        let created = self.mutate(|file| {
            let secret = loop {
                let candidate = generate_secret();
                let taken = file.super_user.key == candidate
                    || file.api_keys.iter().any(|k| k.key == candidate);
                if !taken {
                    break candidate;
                }
            };
            let key = ApiKey {
                key: secret,
                name: name.to_string(),
                created: Utc::now().date_naive(),
                active,
            };
            file.api_keys.push(key.clone());
            Ok(key)
        })?;

        info!(name = %created.name, key_preview = %super::models::mask_secret(&created.key), "API key created");
        Ok(created)
    }

    /// Partial update addressed by secret prefix.
    pub fn update_key(&self, prefix: &str, update: KeyUpdate) -> Result<MaskedKey, StoreError> {
        let updated = self.mutate(|file| {
            let idx = resolve_prefix(&file.api_keys, prefix)?;
            let entry = &mut file.api_keys[idx];
            if let Some(active) = update.active {
                entry.active = active;
            }
            if let Some(name) = update.name.clone() {
                entry.name = name;
            }
            Ok(MaskedKey::from_key(entry))
        })?;

        info!(name = %updated.name, key_preview = %updated.key_preview, "API key updated");
        Ok(updated)
    }

    /// Permanent removal addressed by secret prefix. Not idempotent: a second
    /// delete with the now-stale prefix reports `KeyNotFound`.
    pub fn delete_key(&self, prefix: &str) -> Result<MaskedKey, StoreError> {
        let removed = self.mutate(|file| {
            let idx = resolve_prefix(&file.api_keys, prefix)?;
            let key = file.api_keys.remove(idx);
            Ok(MaskedKey::from_key(&key))
        })?;

        warn!(name = %removed.name, key_preview = %removed.key_preview, "API key deleted");
        Ok(removed)
    }

    /// Apply a mutation to a draft of the state, persist the draft, and only
    /// then commit it to memory. A persistence failure leaves both the file
    /// and the in-memory state untouched.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut StoreFile) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.write();
        let mut draft = state.clone();
        let out = op(&mut draft)?;
        self.persist(&draft)?;
        *state = draft;
        Ok(out)
    }

    fn persist(&self, file: &StoreFile) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(file)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut out = fs::File::create(&tmp)?;
            out.write_all(json.as_bytes())?;
            out.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// 32 bytes from the OS CSPRNG, URL-safe base64 without padding (43 chars).
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn resolve_prefix(keys: &[ApiKey], prefix: &str) -> Result<usize, StoreError> {
    if prefix.is_empty() {
        return Err(StoreError::KeyNotFound(prefix.to_string()));
    }
    let mut matches = keys
        .iter()
        .enumerate()
        .filter(|(_, k)| k.key.starts_with(prefix));
    match (matches.next(), matches.next()) {
        (Some((idx, _)), None) => Ok(idx),
        (Some(_), Some(_)) => Err(StoreError::AmbiguousPrefix {
            prefix: prefix.to_string(),
            count: keys.iter().filter(|k| k.key.starts_with(prefix)).count(),
        }),
        (None, _) => Err(StoreError::KeyNotFound(prefix.to_string())),
    }
}
