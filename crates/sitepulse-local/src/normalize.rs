//! Markup → plain text → chunks.
//!
//! Everything here is lenient: malformed HTML is repaired by the parser and absent input
//! degrades to empty output, never to an error.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, StartTag, TagToken, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use html_scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text never reaches the cleaned output.
const INVISIBLE: [&str; 3] = ["script", "style", "noscript"];

/// Line separators recognized when splitting text nodes into lines.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn is_space(c: char) -> bool {
    c.is_whitespace() || matches!(c, '\x1c'..='\x1f')
}

/// Watches the token stream for a real `<body>` start tag.
///
/// Raw-text elements are switched into their raw states so markup-looking text inside
/// `<script>`, `<style>` or `<textarea>` is never read as a tag. Comments and attribute values
/// arrive as their own tokens already.
#[derive(Default)]
struct BodyTagSink {
    seen: bool,
}

impl TokenSink for BodyTagSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let TagToken(tag) = token else {
            return TokenSinkResult::Continue;
        };
        if tag.kind != StartTag {
            return TokenSinkResult::Continue;
        }
        match &*tag.name {
            "body" => {
                self.seen = true;
                TokenSinkResult::Continue
            }
            "script" => TokenSinkResult::RawData(RawKind::ScriptData),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
                TokenSinkResult::RawData(RawKind::Rawtext)
            }
            "title" | "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
            _ => TokenSinkResult::Continue,
        }
    }
}

fn has_body_tag(markup: &str) -> bool {
    let mut input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(markup));
    let mut tok = Tokenizer::new(BodyTagSink::default(), TokenizerOpts::default());
    let _ = tok.feed(&mut input);
    tok.end();
    tok.sink.seen
}

/// Serialized `<body>` element of `markup`, or `""` when the document has no body.
///
/// The HTML5 tree builder always synthesizes a body, so only a `<body>` start tag in the
/// source counts as "having one".
pub fn extract_body(markup: &str) -> String {
    if markup.trim().is_empty() || !has_body_tag(markup) {
        return String::new();
    }
    let doc = Html::parse_document(markup);
    let Ok(sel) = Selector::parse("body") else {
        return String::new();
    };
    doc.select(&sel)
        .next()
        .map(|body| body.html())
        .unwrap_or_default()
}

fn push_text_nodes(el: ElementRef<'_>, out: &mut Vec<String>) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => {
                let s: &str = &t.text;
                out.push(s.to_string());
            }
            Node::Element(e) => {
                if INVISIBLE.contains(&e.name()) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_text_nodes(child_el, out);
                }
            }
            _ => {}
        }
    }
}

/// Visible text of `body_markup`, one trimmed non-empty line per text line, in document order.
pub fn clean(body_markup: &str) -> String {
    if body_markup.trim().is_empty() {
        return String::new();
    }
    let doc = Html::parse_document(body_markup);
    let mut nodes = Vec::new();
    push_text_nodes(doc.root_element(), &mut nodes);

    nodes
        .iter()
        .flat_map(|t| t.split(is_line_break))
        .map(|line| line.trim_matches(is_space))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Contiguous chunks of at most `max_chars` characters; only the last may be shorter.
///
/// `max_chars == 0` is treated as 1.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::with_capacity(text.len() / max_chars + 1);
    let mut start = 0usize;
    let mut n = 0usize;
    for (i, _) in text.char_indices() {
        if n == max_chars {
            out.push(text[start..i].to_string());
            start = i;
            n = 0;
        }
        n += 1;
    }
    if start < text.len() {
        out.push(text[start..].to_string());
    }
    out
}

/// `extract_body` then `clean`.
pub fn markup_to_text(markup: &str) -> String {
    clean(&extract_body(markup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PAGE: &str = "<html><body><script>ignore()</script><p>Great product, highly recommend!</p><p>x</p></body></html>";

    #[test]
    fn extract_body_serializes_the_body_element() {
        let body = extract_body(PAGE);
        assert!(body.starts_with("<body>"), "{body}");
        assert!(body.ends_with("</body>"), "{body}");
        assert!(body.contains("<p>Great product, highly recommend!</p>"));
    }

    #[test]
    fn extract_body_is_empty_without_a_body() {
        assert_eq!(extract_body(""), "");
        assert_eq!(extract_body("   "), "");
        assert_eq!(extract_body("<p>just a fragment</p>"), "");
        assert_eq!(extract_body("plain text, no markup at all"), "");
        assert_eq!(extract_body("<!-- <body> --><p>fragment only</p>"), "");
        assert_eq!(
            extract_body("<html><head><script>var s='<body>';</script></head><p>x</p></html>"),
            ""
        );
        assert_eq!(extract_body(r#"<div title="<body>">x</div>"#), "");
        assert_eq!(extract_body("<style>/* <body> */</style><p>x</p>"), "");
        assert_eq!(extract_body("<textarea><body></textarea>"), "");
    }

    #[test]
    fn extract_body_finds_uppercase_and_attributed_body_tags() {
        assert!(extract_body("<HTML><BODY>x</BODY></HTML>").contains('x'));
        assert!(extract_body(r#"<body class="home" data-x='1'><p>hi</p>"#).contains("<p>hi</p>"));
        assert!(extract_body("<!-- head --><script>1</script><body>after</body>").contains("after"));
    }

    #[test]
    fn extract_body_tolerates_malformed_markup() {
        let body = extract_body("<html><BODY><div><p>unclosed <b>bold</div>");
        assert!(body.contains("unclosed"));
        assert!(body.contains("bold"));
    }

    #[test]
    fn clean_drops_invisible_elements_and_keeps_short_lines() {
        let cleaned = clean(&extract_body(PAGE));
        assert_eq!(cleaned, "Great product, highly recommend!\nx");
        assert!(!cleaned.contains("ignore()"));
    }

    #[test]
    fn clean_emits_one_line_per_text_node_in_order() {
        let html = r#"<body>
            <style>.a { color: red }</style>
            <h1>  Title  </h1>
            <noscript>enable js</noscript>
            <div>first<span>second</span>third</div>
            <p>multi
               line</p>
        </body>"#;
        assert_eq!(clean(html), "Title\nfirst\nsecond\nthird\nmulti\nline");
    }

    #[test]
    fn clean_recovers_malformed_tables_like_a_browser() {
        // Stray table text is foster-parented ahead of the table, as a rendered DOM would have it.
        assert_eq!(
            clean("<body><table><tr><td>A</td></tr>B</table></body>"),
            "B\nA"
        );
        assert_eq!(
            clean("<body><table><tr><td>A</td><td>B</td></tr></table></body>"),
            "A\nB"
        );
    }

    #[test]
    fn clean_of_empty_input_is_empty() {
        assert_eq!(clean(""), "");
        assert_eq!(markup_to_text(""), "");
    }

    #[test]
    fn clean_trims_non_breaking_space() {
        assert_eq!(clean("<body><p>\u{a0}hi\u{a0}</p></body>"), "hi");
    }

    #[test]
    fn split_examples() {
        assert!(split_chunks("", 6000).is_empty());
        assert_eq!(split_chunks("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(split_chunks("abcd", 4), vec!["abcd"]);
        assert_eq!(split_chunks("ééé", 2), vec!["éé", "é"]);
        assert_eq!(split_chunks("ab", 0), vec!["a", "b"]);
    }

    proptest! {
        #[test]
        fn split_reconstructs_and_bounds_chunks(text in any::<String>(), max in 1usize..64) {
            let chunks = split_chunks(&text, max);
            prop_assert_eq!(chunks.concat(), text.clone());
            let n = text.chars().count();
            prop_assert_eq!(chunks.len(), n.div_ceil(max));
            for (i, c) in chunks.iter().enumerate() {
                let len = c.chars().count();
                prop_assert!(len <= max);
                prop_assert!(len > 0);
                if i + 1 < chunks.len() {
                    prop_assert_eq!(len, max);
                }
            }
        }

        #[test]
        fn clean_never_leaks_script_or_style_text(
            before in "[a-zA-Z ,.]{0,40}",
            after in "[a-zA-Z ,.\n]{0,40}",
        ) {
            let html = format!(
                "<html><body><p>{before}</p><script>var zzq1 = 1;</script>\
                 <style>.zzq2 {{}}</style><div>{after}</div></body></html>"
            );
            let cleaned = markup_to_text(&html);
            prop_assert!(!cleaned.contains("zzq1"));
            prop_assert!(!cleaned.contains("zzq2"));
            for line in cleaned.split('\n') {
                prop_assert!(!line.is_empty() || cleaned.is_empty());
                prop_assert_eq!(line, line.trim());
            }
        }
    }
}
