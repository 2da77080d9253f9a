use crate::lexicon::PatternLexicon;
use regex::Regex;
use sitepulse_core::{
    FrequencyMap, PolarityEstimator, Sentiment, SentimentReport, SentimentResult,
    MIN_PARAGRAPH_CHARS,
};
use std::sync::OnceLock;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-zA-Z]{4,}\b").expect("static word regex"))
}

/// Whether a cleaned-text line qualifies as a paragraph for analysis.
pub fn is_paragraph(line: &str) -> bool {
    line.trim().chars().count() > MIN_PARAGRAPH_CHARS
}

/// Per-paragraph classification and aggregation over cleaned text.
pub struct SentimentAggregator {
    estimator: Box<dyn PolarityEstimator>,
}

impl Default for SentimentAggregator {
    fn default() -> Self {
        Self::new(Box::new(PatternLexicon::new()))
    }
}

impl SentimentAggregator {
    pub fn new(estimator: Box<dyn PolarityEstimator>) -> Self {
        Self { estimator }
    }

    pub fn analyze_paragraph(&self, text: &str) -> (Sentiment, f64) {
        let score = self.estimator.polarity(text).clamp(-1.0, 1.0);
        (Sentiment::from_score(score), score)
    }

    /// Analyze every line of `cleaned` longer than 40 chars, in document order.
    pub fn report(&self, cleaned: &str) -> SentimentReport {
        let mut out = SentimentReport::default();
        for para in cleaned.split('\n').filter(|p| is_paragraph(p)) {
            let (sentiment, score) = self.analyze_paragraph(para);
            out.tally.increment(sentiment);
            out.results.push(SentimentResult {
                text: para.to_string(),
                sentiment,
                score,
            });
            out.all_text.push(' ');
            out.all_text.push_str(para);
        }
        tracing::debug!(
            paragraphs = out.results.len(),
            positive = out.tally.positive,
            neutral = out.tally.neutral,
            negative = out.tally.negative,
            "sentiment report"
        );
        out
    }
}

/// Counts of every run of 4+ ASCII letters, case preserved.
pub fn word_frequency(text: &str) -> FrequencyMap {
    let mut freq = FrequencyMap::new();
    for m in word_re().find_iter(text) {
        freq.add(m.as_str());
    }
    freq
}
