use crate::normalize;
use crate::retrieve::Retriever;
use serde::Serialize;
use sitepulse_core::RawPage;

/// Output of one scrape: the raw page plus its cleaned text.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedPage {
    pub raw: RawPage,
    pub cleaned: String,
}

impl ScrapedPage {
    pub fn from_raw(raw: RawPage) -> Self {
        let cleaned = normalize::markup_to_text(&raw.content);
        Self { raw, cleaned }
    }

    pub fn chunks(&self, max_chars: usize) -> Vec<String> {
        normalize::split_chunks(&self.cleaned, max_chars)
    }
}

/// URL → raw markup → cleaned text.
pub async fn scrape(retriever: &Retriever, url: &str) -> ScrapedPage {
    let page = ScrapedPage::from_raw(retriever.retrieve(url).await);
    tracing::info!(
        url,
        source = ?page.raw.source,
        cleaned_chars = page.cleaned.chars().count(),
        "scrape complete"
    );
    page
}
