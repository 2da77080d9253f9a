use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Paragraphs must be strictly longer than this (trimmed, in chars) to be analyzed.
pub const MIN_PARAGRAPH_CHARS: usize = 40;

/// Default chunk size (chars) for the extraction service.
pub const DEFAULT_CHUNK_CHARS: usize = 6000;

/// Which retrieval strategy produced a page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    /// Headless browser, after client-side rendering.
    Rendered,
    /// Plain HTTP GET fallback.
    Fetched,
    /// Both strategies failed.
    Empty,
}

/// Unprocessed page payload. `content` is empty on total failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    pub url: String,
    pub content: String,
    pub source: PageSource,
    /// Diagnostics from failed strategies (never part of the content contract).
    pub warnings: Vec<String>,
}

impl RawPage {
    pub fn empty(url: &str, warnings: Vec<String>) -> Self {
        Self {
            url: url.to_string(),
            content: String::new(),
            source: PageSource::Empty,
            warnings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Primary retrieval strategy: a full browser render of `url`.
#[async_trait::async_trait]
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn render(&self, url: &str) -> Result<String>;
}

/// Fallback retrieval strategy: a direct HTTP GET of `url`.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Language-model extraction over an ordered chunk sequence.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, chunks: &[String], instruction: &str) -> Result<String>;
}

/// Pure `text -> score` polarity estimate. Implementations must return a value in [-1.0, 1.0]
/// and the same value for the same text on every call.
pub trait PolarityEstimator: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

impl<F> PolarityEstimator for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn polarity(&self, text: &str) -> f64 {
        self(text)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    /// `> 0.1` is positive, `< -0.1` is negative; the boundaries themselves are neutral.
    pub fn from_score(score: f64) -> Self {
        if score > 0.1 {
            Sentiment::Positive
        } else if score < -0.1 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analyzed paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentResult {
    /// The paragraph, verbatim.
    pub text: String,
    pub sentiment: Sentiment,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SentimentTally {
    #[serde(rename = "Positive")]
    pub positive: usize,
    #[serde(rename = "Neutral")]
    pub neutral: usize,
    #[serde(rename = "Negative")]
    pub negative: usize,
}

impl SentimentTally {
    pub fn get(&self, s: Sentiment) -> usize {
        match s {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    pub fn increment(&mut self, s: Sentiment) {
        match s {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    /// Label/count pairs in chart order (Positive, Neutral, Negative).
    pub fn iter(&self) -> impl Iterator<Item = (Sentiment, usize)> + '_ {
        Sentiment::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

/// Word -> occurrence count. Ordered, so serialization and iteration are deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FrequencyMap(BTreeMap<String, usize>);

impl FrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word: &str) {
        *self.0.entry(word.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        self.0.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Highest counts first; ties broken by word so the order is stable.
    pub fn top(&self, n: usize) -> Vec<(&str, usize)> {
        let mut out: Vec<(&str, usize)> = self.iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        out.truncate(n);
        out
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for FrequencyMap {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Aggregated sentiment over one cleaned text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SentimentReport {
    /// One entry per analyzed paragraph, in document order.
    pub results: Vec<SentimentResult>,
    pub tally: SentimentTally,
    /// Analyzed paragraphs, each prefixed with a single space.
    pub all_text: String,
}

impl SentimentReport {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_exclusive() {
        assert_eq!(Sentiment::from_score(0.1), Sentiment::Neutral);
        assert_eq!(Sentiment::from_score(-0.1), Sentiment::Neutral);
        assert_eq!(Sentiment::from_score(0.0), Sentiment::Neutral);
        assert_eq!(Sentiment::from_score(0.100_001), Sentiment::Positive);
        assert_eq!(Sentiment::from_score(-0.100_001), Sentiment::Negative);
        assert_eq!(Sentiment::from_score(1.0), Sentiment::Positive);
        assert_eq!(Sentiment::from_score(-1.0), Sentiment::Negative);
    }

    #[test]
    fn tally_serializes_with_label_keys() {
        let mut t = SentimentTally::default();
        t.increment(Sentiment::Positive);
        t.increment(Sentiment::Positive);
        t.increment(Sentiment::Negative);
        let v = serde_json::to_value(t).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"Positive": 2, "Neutral": 0, "Negative": 1})
        );
        assert_eq!(t.total(), 3);
        let order: Vec<_> = t.iter().map(|(s, _)| s).collect();
        assert_eq!(order, Sentiment::ALL.to_vec());
    }

    #[test]
    fn frequency_top_is_count_desc_then_word() {
        let mut f = FrequencyMap::new();
        for w in ["beta", "alpha", "beta", "gamma", "alpha", "delta"] {
            f.add(w);
        }
        assert_eq!(
            f.top(3),
            vec![("alpha", 2), ("beta", 2), ("delta", 1)]
        );
        assert_eq!(f.top(0), Vec::<(&str, usize)>::new());
    }

    #[test]
    fn closures_are_polarity_estimators() {
        let est = |t: &str| if t.contains("good") { 0.5 } else { 0.0 };
        assert_eq!(est.polarity("good"), 0.5);
        assert_eq!(Sentiment::from_score(est.polarity("meh")), Sentiment::Neutral);
    }

    #[test]
    fn empty_raw_page_is_marked_empty() {
        let p = RawPage::empty("https://example.com", vec!["x".to_string()]);
        assert!(p.is_empty());
        assert_eq!(p.source, PageSource::Empty);
    }
}
