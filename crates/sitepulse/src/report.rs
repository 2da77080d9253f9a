//! Text and JSON renderings of scrape, extract, and sentiment results.

use serde_json::{json, Value};
use sitepulse_core::{FrequencyMap, Sentiment, SentimentReport, SentimentResult, SentimentTally};
use sitepulse_local::pipeline::ScrapedPage;

/// Paragraph excerpts in the sentiment listing are cut to this many characters.
pub const EXCERPT_CHARS: usize = 250;

const BAR_WIDTH: usize = 40;

pub fn marker(s: Sentiment) -> &'static str {
    match s {
        Sentiment::Positive => "🟢",
        Sentiment::Negative => "🔴",
        Sentiment::Neutral => "⚪",
    }
}

/// First `max_chars` characters followed by `...` (always appended).
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

pub fn paragraph_line(r: &SentimentResult) -> String {
    format!(
        "{} {} (score: {:.2}): {}",
        marker(r.sentiment),
        r.sentiment,
        r.score,
        excerpt(&r.text, EXCERPT_CHARS)
    )
}

/// Horizontal bar per label, scaled so the largest count spans `width`.
pub fn bar_chart(tally: &SentimentTally, width: usize) -> String {
    let max = tally.iter().map(|(_, n)| n).max().unwrap_or(0);
    let label_w = Sentiment::ALL
        .iter()
        .map(|s| s.as_str().len())
        .max()
        .unwrap_or(0);
    tally
        .iter()
        .map(|(s, n)| {
            let len = if max == 0 { 0 } else { (n * width).div_ceil(max) };
            format!("{:<label_w$} | {} {n}", s.as_str(), "#".repeat(len))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn top_words(freq: &FrequencyMap, n: usize) -> String {
    let top = freq.top(n);
    let w = top.iter().map(|(word, _)| word.len()).max().unwrap_or(0);
    top.iter()
        .map(|(word, count)| format!("  {word:<w$}  {count}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn sentiment_text(report: &SentimentReport, freq: &FrequencyMap, top_n: usize) -> String {
    if report.is_empty() {
        return "No paragraphs long enough to analyze.".to_string();
    }
    let mut out = String::new();
    out.push_str("Sentiment distribution\n");
    out.push_str(&bar_chart(&report.tally, BAR_WIDTH));
    if !freq.is_empty() && top_n > 0 {
        out.push_str("\n\nTop words\n");
        out.push_str(&top_words(freq, top_n));
    }
    out.push_str("\n\nParagraphs\n");
    let lines: Vec<String> = report.results.iter().map(paragraph_line).collect();
    out.push_str(&lines.join("\n"));
    out
}

pub fn scrape_json(page: &ScrapedPage, max_chunk_chars: usize) -> Value {
    json!({
        "url": page.raw.url,
        "source": page.raw.source,
        "cleaned_text": page.cleaned,
        "chars": page.cleaned.chars().count(),
        "chunks": page.chunks(max_chunk_chars).len(),
        "warnings": page.raw.warnings,
    })
}

pub fn sentiment_json(
    page: &ScrapedPage,
    report: &SentimentReport,
    freq: &FrequencyMap,
    top_n: usize,
) -> Value {
    let top: Vec<Value> = freq
        .top(top_n)
        .into_iter()
        .map(|(word, count)| json!({"word": word, "count": count}))
        .collect();
    json!({
        "url": page.raw.url,
        "source": page.raw.source,
        "tally": report.tally,
        "results": report.results,
        "word_frequency": freq,
        "top_words": top,
        "warnings": page.raw.warnings,
    })
}
