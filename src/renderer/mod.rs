//! HTML to PDF rendering collaborator
//!
//! The conversion endpoint hands composed HTML to a [`PdfRenderer`]; the
//! default implementation drives headless Chromium. Rendering fidelity is the
//! browser's problem, not ours; this module only maps request options onto
//! the print call and propagates failures.

pub mod chromium;

pub use chromium::ChromiumRenderer;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("render I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rendering timed out after {0}s")]
    Timeout(u64),
    #[error("browser error: {0}")]
    Browser(#[from] anyhow::Error),
}

/// Paper and layout options for a single render, in CDP units (inches).
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub paper_width: Option<f64>,
    pub paper_height: Option<f64>,
    pub margin_inches: f64,
    /// Honor any @page size declared in the document's CSS.
    pub prefer_css_page_size: bool,
    pub viewport: (u32, u32),
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            paper_width: None,
            paper_height: None,
            margin_inches: 0.0,
            prefer_css_page_size: false,
            viewport: (1920, 1080),
        }
    }
}

impl RenderOptions {
    /// Build options from the conversion request fields. Unknown page sizes
    /// and unparseable width/height values are rejected; a malformed margin
    /// falls back to zero.
    pub fn from_request(
        page_size: &str,
        width: Option<&str>,
        height: Option<&str>,
        margin: Option<&str>,
        viewport: (u32, u32),
    ) -> Result<Self, RenderError> {
        let mut options = RenderOptions {
            viewport,
            ..Default::default()
        };

        match page_size.to_ascii_lowercase().as_str() {
            "auto" => options.prefer_css_page_size = true,
            name => match paper_size(name) {
                Some((w, h)) => {
                    options.paper_width = Some(w);
                    options.paper_height = Some(h);
                }
                None => {
                    return Err(RenderError::InvalidDimension(format!(
                        "unknown page size '{page_size}'"
                    )))
                }
            },
        }

        if let Some(raw) = width {
            options.paper_width = Some(
                css_length_to_inches(raw)
                    .ok_or_else(|| RenderError::InvalidDimension(raw.to_string()))?,
            );
        }
        if let Some(raw) = height {
            options.paper_height = Some(
                css_length_to_inches(raw)
                    .ok_or_else(|| RenderError::InvalidDimension(raw.to_string()))?,
            );
        }

        options.margin_inches = margin.and_then(css_length_to_inches).unwrap_or(0.0);

        Ok(options)
    }
}

/// Seam between the HTTP surface and the rendering engine.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, options: &RenderOptions) -> Result<Bytes, RenderError>;
}

/// Named paper formats in inches (width, height).
fn paper_size(name: &str) -> Option<(f64, f64)> {
    match name {
        "a3" => Some((11.69, 16.54)),
        "a4" => Some((8.27, 11.69)),
        "a5" => Some((5.83, 8.27)),
        "letter" => Some((8.5, 11.0)),
        "legal" => Some((8.5, 14.0)),
        "tabloid" => Some((11.0, 17.0)),
        _ => None,
    }
}

/// Parse a CSS length (`1200px`, `21cm`, `297mm`, `11in`, bare pixels) into
/// inches at 96dpi.
fn css_length_to_inches(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let (value, divisor) = if let Some(v) = raw.strip_suffix("px") {
        (v, 96.0)
    } else if let Some(v) = raw.strip_suffix("cm") {
        (v, 2.54)
    } else if let Some(v) = raw.strip_suffix("mm") {
        (v, 25.4)
    } else if let Some(v) = raw.strip_suffix("in") {
        (v, 1.0)
    } else {
        (raw, 96.0)
    };
    let value: f64 = value.trim().parse().ok()?;
    (value >= 0.0).then(|| value / divisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_lengths_convert_to_inches() {
        assert_eq!(css_length_to_inches("96px"), Some(1.0));
        assert_eq!(css_length_to_inches("2.54cm"), Some(1.0));
        assert_eq!(css_length_to_inches("25.4mm"), Some(1.0));
        assert_eq!(css_length_to_inches("3in"), Some(3.0));
        assert_eq!(css_length_to_inches("48"), Some(0.5));
        assert_eq!(css_length_to_inches(" 10 px "), Some(10.0 / 96.0));
        assert_eq!(css_length_to_inches("-5px"), None);
        assert_eq!(css_length_to_inches("wide"), None);
    }

    #[test]
    fn test_named_page_sizes() {
        let options = RenderOptions::from_request("Letter", None, None, None, (1920, 1080)).unwrap();
        assert_eq!(options.paper_width, Some(8.5));
        assert_eq!(options.paper_height, Some(11.0));
        assert!(!options.prefer_css_page_size);
    }

    #[test]
    fn test_auto_defers_to_css_page_size() {
        let options = RenderOptions::from_request("auto", None, None, None, (800, 600)).unwrap();
        assert!(options.prefer_css_page_size);
        assert_eq!(options.paper_width, None);
    }

    #[test]
    fn test_custom_dimensions_override_named_size() {
        let options =
            RenderOptions::from_request("A4", Some("1200px"), None, None, (1920, 1080)).unwrap();
        assert_eq!(options.paper_width, Some(12.5));
        assert_eq!(options.paper_height, Some(11.69));
    }

    #[test]
    fn test_unknown_page_size_rejected() {
        assert!(matches!(
            RenderOptions::from_request("A9", None, None, None, (1920, 1080)),
            Err(RenderError::InvalidDimension(_))
        ));
    }

    #[test]
    fn test_malformed_margin_falls_back_to_zero() {
        let options =
            RenderOptions::from_request("A4", None, None, Some("thick"), (1920, 1080)).unwrap();
        assert_eq!(options.margin_inches, 0.0);

        let options =
            RenderOptions::from_request("A4", None, None, Some("96px"), (1920, 1080)).unwrap();
        assert_eq!(options.margin_inches, 1.0);
    }
}
