use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

const STRIP_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "nav", "footer", "header"];

static OG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[property^='og:']").unwrap());
static CANONICAL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("link[rel='canonical']").unwrap());
static JSON_LD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// Structured content pulled from one page, the same shape the
/// original content parser returns from `parse(html, url)`.
#[derive(Debug, Clone, Default)]
pub struct ParsedContent {
    pub title: String,
    pub text: String,
    pub metadata: HashMap<String, Value>,
}

/// Parses `html` into title, visible text, and metadata. Mirrors the
/// original `ContentParser`: the built-in extractor set is metadata
/// (description/keywords/open-graph/canonical/language), JSON-LD, and
/// headings; callers can fold in more keys the same way the original's
/// `add_extractor` extension point allows.
pub fn parse(html: &str, _url: &str) -> ParsedContent {
    if html.is_empty() {
        return ParsedContent::default();
    }

    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let text = extract_text(html);

    let mut metadata = HashMap::new();
    metadata.extend(extract_metadata(&document));
    if let Some(json_ld) = extract_json_ld(&document) {
        metadata.insert("json_ld".to_string(), json_ld);
    }
    if let Some(headings) = extract_headings(&document) {
        metadata.insert("headings".to_string(), headings);
    }

    ParsedContent { title, text, metadata }
}

/// Extension point for registering metadata extractors beyond the
/// built-in set, mirroring `BaseExtractor`/`ContentParser.add_extractor`
/// (`original_source/src/crawler/parser.py`,
/// `original_source/examples/example_custom_extractors.py`). Only the
/// extension point is provided here — the built-in extractor set is
/// what spec.md's content parser names, and no concrete extractors
/// beyond it are in scope.
pub trait MetadataExtractor: Send + Sync {
    /// Returns the metadata key and value to insert under, `Ok(None)`
    /// if this page has nothing for this extractor to contribute, or
    /// `Err` if extraction failed outright.
    fn extract(&self, document: &Html, url: &str) -> anyhow::Result<Option<(String, Value)>>;
}

/// Like [`parse`], but folds in the result of each registered
/// extractor after the built-in set runs, so a later extractor can
/// overwrite an earlier one's key the same way `add_extractor`
/// ordering does in the original. A failing extractor is logged and
/// skipped; it never aborts the parse.
pub fn parse_with_extractors(
    html: &str,
    url: &str,
    extractors: &[Arc<dyn MetadataExtractor>],
) -> ParsedContent {
    let mut parsed = parse(html, url);
    if html.is_empty() || extractors.is_empty() {
        return parsed;
    }
    let document = Html::parse_document(html);
    for extractor in extractors {
        match extractor.extract(&document, url) {
            Ok(Some((key, value))) => {
                parsed.metadata.insert(key, value);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(url, error = %e, "metadata extractor failed, skipping");
            }
        }
    }
    parsed
}

fn extract_title(document: &Html) -> String {
    if let Ok(sel) = Selector::parse("title") {
        if let Some(el) = document.select(&sel).next() {
            let t = el.text().collect::<String>().trim().to_string();
            if !t.is_empty() {
                return t;
            }
        }
    }
    if let Ok(sel) = Selector::parse("h1") {
        if let Some(el) = document.select(&sel).next() {
            return el.text().collect::<String>().trim().to_string();
        }
    }
    String::new()
}

/// Strips non-content tags, then collapses whitespace — mirrors the
/// original's decompose-then-`get_text(separator=" ")` pipeline.
fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let strip_selector = STRIP_TAGS.join(",");
    let excluded: std::collections::HashSet<_> = Selector::parse(&strip_selector)
        .map(|sel| document.select(&sel).map(|el| el.id()).collect())
        .unwrap_or_default();

    let body_selector = Selector::parse("body").unwrap();
    let root = document.select(&body_selector).next();

    let mut words = Vec::new();
    if let Some(root) = root {
        for node in root.descendants() {
            if let Some(text) = node.value().as_text() {
                let is_excluded = node
                    .ancestors()
                    .any(|anc| excluded.contains(&anc.id()));
                if !is_excluded {
                    words.extend(text.split_whitespace().map(str::to_string));
                }
            }
        }
    }
    words.join(" ")
}

fn extract_metadata(document: &Html) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();

    if let Ok(sel) = Selector::parse("meta[name='description']") {
        if let Some(el) = document.select(&sel).next() {
            if let Some(content) = el.value().attr("content") {
                metadata.insert(
                    "description".to_string(),
                    Value::String(content.trim().to_string()),
                );
            }
        }
    }

    if let Ok(sel) = Selector::parse("meta[name='keywords']") {
        if let Some(el) = document.select(&sel).next() {
            if let Some(content) = el.value().attr("content") {
                let keywords: Vec<Value> = content
                    .split(',')
                    .map(|k| Value::String(k.trim().to_string()))
                    .collect();
                metadata.insert("keywords".to_string(), Value::Array(keywords));
            }
        }
    }

    let mut open_graph = serde_json::Map::new();
    for el in document.select(&OG_SELECTOR) {
        if let (Some(prop), Some(content)) = (el.value().attr("property"), el.value().attr("content")) {
            let key = prop.trim_start_matches("og:").to_string();
            if !key.is_empty() && !content.is_empty() {
                open_graph.insert(key, Value::String(content.to_string()));
            }
        }
    }
    if !open_graph.is_empty() {
        metadata.insert("open_graph".to_string(), Value::Object(open_graph));
    }

    if let Some(el) = document.select(&CANONICAL_SELECTOR).next() {
        if let Some(href) = el.value().attr("href") {
            metadata.insert("canonical_url".to_string(), Value::String(href.to_string()));
        }
    }

    if let Ok(sel) = Selector::parse("html") {
        if let Some(el) = document.select(&sel).next() {
            if let Some(lang) = el.value().attr("lang") {
                metadata.insert("language".to_string(), Value::String(lang.to_string()));
            }
        }
    }

    metadata
}

fn extract_json_ld(document: &Html) -> Option<Value> {
    let entries: Vec<Value> = document
        .select(&JSON_LD_SELECTOR)
        .filter_map(|el| {
            let text = el.text().collect::<String>();
            serde_json::from_str(&text).ok()
        })
        .collect();
    if entries.is_empty() {
        None
    } else {
        Some(Value::Array(entries))
    }
}

fn extract_headings(document: &Html) -> Option<Value> {
    let mut headings = serde_json::Map::new();
    for level in 1..=6 {
        let tag = format!("h{level}");
        if let Ok(sel) = Selector::parse(&tag) {
            let found: Vec<Value> = document
                .select(&sel)
                .map(|el| Value::String(el.text().collect::<String>().trim().to_string()))
                .collect();
            if !found.is_empty() {
                headings.insert(tag, Value::Array(found));
            }
        }
    }
    if headings.is_empty() {
        None
    } else {
        Some(Value::Object(headings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_html_yields_empty_content() {
        let parsed = parse("", "https://example.com");
        assert_eq!(parsed.title, "");
        assert_eq!(parsed.text, "");
    }

    #[test]
    fn title_falls_back_to_h1() {
        let parsed = parse("<html><body><h1>Fallback Title</h1></body></html>", "https://example.com");
        assert_eq!(parsed.title, "Fallback Title");
    }

    #[test]
    fn strips_script_and_nav_from_text() {
        let html = "<html><body><nav>Nav Links</nav><p>Real content</p><script>evil()</script></body></html>";
        let parsed = parse(html, "https://example.com");
        assert!(parsed.text.contains("Real content"));
        assert!(!parsed.text.contains("Nav Links"));
        assert!(!parsed.text.contains("evil"));
    }

    #[test]
    fn extracts_meta_description_and_open_graph() {
        let html = r#"<html><head>
            <meta name="description" content="A test page">
            <meta property="og:title" content="OG Title">
        </head><body></body></html>"#;
        let parsed = parse(html, "https://example.com");
        assert_eq!(
            parsed.metadata.get("description").and_then(|v| v.as_str()),
            Some("A test page")
        );
        let og = parsed.metadata.get("open_graph").unwrap();
        assert_eq!(og.get("title").and_then(|v| v.as_str()), Some("OG Title"));
    }

    struct WordCountExtractor;
    impl MetadataExtractor for WordCountExtractor {
        fn extract(&self, document: &Html, _url: &str) -> anyhow::Result<Option<(String, Value)>> {
            let words = document.root_element().text().collect::<String>().split_whitespace().count();
            Ok(Some(("word_count".to_string(), Value::from(words))))
        }
    }

    struct FailingExtractor;
    impl MetadataExtractor for FailingExtractor {
        fn extract(&self, _document: &Html, _url: &str) -> anyhow::Result<Option<(String, Value)>> {
            anyhow::bail!("boom")
        }
    }

    #[test]
    fn custom_extractor_folds_into_metadata() {
        let html = "<html><body><p>three word count</p></body></html>";
        let extractors: Vec<Arc<dyn MetadataExtractor>> = vec![Arc::new(WordCountExtractor)];
        let parsed = parse_with_extractors(html, "https://example.com", &extractors);
        assert_eq!(parsed.metadata.get("word_count").and_then(|v| v.as_u64()), Some(3));
    }

    #[test]
    fn failing_extractor_is_skipped_not_fatal() {
        let html = "<html><title>T</title></html>";
        let extractors: Vec<Arc<dyn MetadataExtractor>> =
            vec![Arc::new(FailingExtractor), Arc::new(WordCountExtractor)];
        let parsed = parse_with_extractors(html, "https://example.com", &extractors);
        assert_eq!(parsed.title, "T");
        assert!(parsed.metadata.contains_key("word_count"));
    }

    #[test]
    fn no_extractors_matches_plain_parse() {
        let html = "<html><title>T</title></html>";
        let parsed = parse_with_extractors(html, "https://example.com", &[]);
        assert_eq!(parsed.title, "T");
    }
}
