//! Headless Chromium renderer
//!
//! Writes the document to a scratch file, opens it in a fresh headless
//! browser, and prints it to PDF over the DevTools protocol. The browser
//! session is blocking, so it runs on the blocking thread pool under a
//! render timeout.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{PdfRenderer, RenderError, RenderOptions};
use crate::config::RendererSettings;

pub struct ChromiumRenderer {
    browser_path: Option<PathBuf>,
    scratch_dir: PathBuf,
    timeout: Duration,
}

impl ChromiumRenderer {
    pub fn new(settings: &RendererSettings) -> Self {
        Self {
            browser_path: settings.browser_path.clone(),
            scratch_dir: settings
                .scratch_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }

    fn print_pdf(
        browser_path: Option<PathBuf>,
        url: String,
        options: RenderOptions,
    ) -> Result<Vec<u8>, RenderError> {
        let (width, height) = options.viewport;
        let launch = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((width, height)))
            .path(browser_path)
            .build()
            .map_err(|e| RenderError::Browser(anyhow::anyhow!(e)))?;

        let browser = Browser::new(launch)?;
        let tab = browser.new_tab()?;
        tab.navigate_to(&url)?;
        tab.wait_until_navigated()?;

        let pdf = tab.print_to_pdf(Some(PrintToPdfOptions {
            print_background: Some(true),
            display_header_footer: Some(false),
            prefer_css_page_size: Some(options.prefer_css_page_size),
            paper_width: options.paper_width,
            paper_height: options.paper_height,
            margin_top: Some(options.margin_inches),
            margin_bottom: Some(options.margin_inches),
            margin_left: Some(options.margin_inches),
            margin_right: Some(options.margin_inches),
            ..Default::default()
        }))?;

        Ok(pdf)
    }
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render(&self, html: &str, options: &RenderOptions) -> Result<Bytes, RenderError> {
        let scratch = self
            .scratch_dir
            .join(format!("pdfsmith-{}.html", Uuid::new_v4()));
        tokio::fs::write(&scratch, html).await?;
        let url = format!("file://{}", scratch.display());

        debug!(url = %url, "Rendering document");

        let browser_path = self.browser_path.clone();
        let print_options = options.clone();
        let task = tokio::task::spawn_blocking(move || {
            Self::print_pdf(browser_path, url, print_options)
        });
        let outcome = tokio::time::timeout(self.timeout, task).await;

        if tokio::fs::remove_file(&scratch).await.is_err() {
            warn!(path = %scratch.display(), "Failed to remove scratch file");
        }

        match outcome {
            Err(_) => Err(RenderError::Timeout(self.timeout.as_secs())),
            Ok(Err(join_error)) => Err(RenderError::Browser(anyhow::anyhow!(join_error))),
            Ok(Ok(result)) => result.map(Bytes::from),
        }
    }
}
