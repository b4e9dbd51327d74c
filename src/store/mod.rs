//! Credential store backed by a single JSON document
//!
//! Holds the API keys, the super user key, and the rate limit configuration.

pub mod keys;
pub mod models;

pub use keys::{KeyStore, KeyUpdate, ResolvedKey, StoreError};
pub use models::{mask_secret, ApiKey, MaskedKey, RateLimitSettings, StoreFile, SuperUser};
