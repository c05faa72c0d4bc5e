use std::collections::HashSet;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Discovers, normalizes, and filters links out of one page. Grounded
/// in the original crawler's link extractor: same skip-list of
/// non-crawlable schemes, same same-domain/allowed-domain gate, same
/// default exclusion patterns.
pub struct LinkExtractor {
    allowed_domains: HashSet<String>,
    same_domain_only: bool,
    excluded_patterns: Vec<Regex>,
    strip_fragments: bool,
}

impl LinkExtractor {
    pub fn new(allowed_domains: HashSet<String>, same_domain_only: bool, excluded_patterns: &[String]) -> Self {
        let excluded_patterns = excluded_patterns
            .iter()
            .filter_map(|p| {
                regex::RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect();
        Self {
            allowed_domains,
            same_domain_only,
            excluded_patterns,
            strip_fragments: true,
        }
    }

    /// Extract all valid, normalized, filtered links from `html`,
    /// resolved against `base_url`. Order of first appearance is
    /// preserved; duplicates within the page are dropped.
    pub fn extract_links(&self, html: &str, base_url: &Url) -> Vec<String> {
        if html.is_empty() {
            return Vec::new();
        }

        let document = Html::parse_document(html);
        let Ok(sel) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        let base_domain = base_url.host_str().unwrap_or("");

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for el in document.select(&sel) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty()
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with('#')
            {
                continue;
            }

            let Ok(absolute) = base_url.join(href) else {
                continue;
            };
            let normalized = self.normalize_url(&absolute);

            if !matches!(normalized.scheme(), "http" | "https") {
                continue;
            }

            let domain = normalized.host_str().unwrap_or("");
            if !self.is_domain_allowed(domain, base_domain) {
                continue;
            }

            let normalized_str = normalized.to_string();
            if self.is_excluded(&normalized_str) {
                continue;
            }

            if seen.insert(normalized_str.clone()) {
                links.push(normalized_str);
            }
        }

        links
    }

    /// Lowercase scheme and host, drop a trailing slash from any
    /// non-root path, and optionally strip the fragment.
    pub fn normalize_url(&self, url: &Url) -> Url {
        let mut normalized = url.clone();
        let _ = normalized.set_scheme(&url.scheme().to_lowercase());
        if let Some(host) = url.host_str() {
            let _ = normalized.set_host(Some(&host.to_lowercase()));
        }
        if self.strip_fragments {
            normalized.set_fragment(None);
        }
        let path = normalized.path().to_string();
        if path.len() > 1 && path.ends_with('/') {
            normalized.set_path(&path[..path.len() - 1]);
        }
        normalized
    }

    fn is_domain_allowed(&self, domain: &str, base_domain: &str) -> bool {
        if !self.allowed_domains.is_empty() {
            return self.allowed_domains.contains(domain);
        }
        if self.same_domain_only {
            return domain == base_domain;
        }
        true
    }

    fn is_excluded(&self, url: &str) -> bool {
        self.excluded_patterns.iter().any(|re| re.is_match(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> LinkExtractor {
        LinkExtractor::new(HashSet::new(), true, &webcrawler_core::config::default_excluded_patterns())
    }

    #[test]
    fn extracts_same_domain_links_only() {
        let html = r#"<a href="/a">a</a><a href="https://other.com/b">b</a>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let links = extractor().extract_links(html, &base);
        assert_eq!(links, vec!["https://example.com/a"]);
    }

    #[test]
    fn skips_non_http_schemes() {
        let html = r#"<a href="mailto:a@b.com">mail</a><a href="javascript:void(0)">js</a><a href="#section">frag</a>"#;
        let base = Url::parse("https://example.com/").unwrap();
        assert!(extractor().extract_links(html, &base).is_empty());
    }

    #[test]
    fn excludes_media_extensions() {
        let html = r#"<a href="/image.png">img</a><a href="/page">page</a>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let links = extractor().extract_links(html, &base);
        assert_eq!(links, vec!["https://example.com/page"]);
    }

    #[test]
    fn normalize_strips_trailing_slash_and_fragment() {
        let url = Url::parse("https://EXAMPLE.com/path/#section").unwrap();
        let normalized = extractor().normalize_url(&url);
        assert_eq!(normalized.as_str(), "https://example.com/path");
    }

    #[test]
    fn deduplicates_repeated_links_on_page() {
        let html = r#"<a href="/a">1</a><a href="/a">2</a>"#;
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(extractor().extract_links(html, &base).len(), 1);
    }
}
