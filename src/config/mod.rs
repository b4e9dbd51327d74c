//! Configuration module for the conversion service

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Main application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub keys: KeySettings,
    pub renderer: RendererSettings,
    /// Optional version manifest served by /version.
    pub version_file: Option<PathBuf>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// JSON body cap; oversized conversion payloads are rejected with 413.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

/// Key store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KeySettings {
    pub path: PathBuf,
}

/// Renderer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RendererSettings {
    /// Explicit Chromium binary; autodetected when unset.
    pub browser_path: Option<PathBuf>,
    /// Where scratch HTML files are written; system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
    #[serde(default = "default_render_timeout")]
    pub timeout_seconds: u64,
}

fn default_max_payload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_render_timeout() -> u64 {
    60
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with PDFSMITH_)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("PDFSMITH")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 5000,
                workers: None,
                max_payload_bytes: default_max_payload_bytes(),
            },
            keys: KeySettings {
                path: PathBuf::from(".api-keys.json"),
            },
            renderer: RendererSettings {
                browser_path: None,
                scratch_dir: None,
                timeout_seconds: default_render_timeout(),
            },
            version_file: Some(PathBuf::from("version.json")),
        }
    }
}
