use crate::fetch::HttpFetcher;
use crate::render::ChromiumRenderer;
use sitepulse_core::{PageFetcher, PageRenderer, PageSource, RawPage, Result};
use tracing::{info, warn};

/// Browser render first, plain GET second, empty page last. Never fails.
pub struct Retriever {
    renderer: Box<dyn PageRenderer>,
    fetcher: Box<dyn PageFetcher>,
}

impl Retriever {
    pub fn new(renderer: Box<dyn PageRenderer>, fetcher: Box<dyn PageFetcher>) -> Self {
        Self { renderer, fetcher }
    }

    /// Chromium renderer + reqwest fetcher, both configured from `SITEPULSE_*` env vars.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            Box::new(ChromiumRenderer::from_env()),
            Box::new(HttpFetcher::from_env()?),
        ))
    }

    pub async fn retrieve(&self, url: &str) -> RawPage {
        let mut warnings = Vec::new();

        match self.renderer.render(url).await {
            Ok(html) => {
                info!(url, renderer = self.renderer.name(), "page rendered");
                return RawPage {
                    url: url.to_string(),
                    content: html,
                    source: PageSource::Rendered,
                    warnings,
                };
            }
            Err(e) => {
                warn!(url, renderer = self.renderer.name(), error = %e, "render failed; falling back to plain HTTP");
                warnings.push(format!("{} render failed: {e}", self.renderer.name()));
            }
        }

        match self.fetcher.fetch_text(url).await {
            Ok(body) => {
                info!(url, bytes = body.len(), "plain HTTP fetch succeeded");
                RawPage {
                    url: url.to_string(),
                    content: body,
                    source: PageSource::Fetched,
                    warnings,
                }
            }
            Err(e) => {
                warn!(url, error = %e, "plain HTTP fetch failed");
                warnings.push(format!("fallback fetch failed: {e}"));
                RawPage::empty(url, warnings)
            }
        }
    }
}
