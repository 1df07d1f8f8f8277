//! Utility functions and helpers.

pub mod http;

use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use url::Url;

use crate::error::{AppError, Result};

static PDF_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.pdf(\?.*)?$").expect("valid PDF link pattern"));

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Whether an absolute link points at a PDF, with an optional query string.
pub fn is_pdf_link(url: &str) -> bool {
    PDF_LINK.is_match(url)
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a CSS selector, mapping failures to a selector error.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::selector(selector, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url_with_trailing_slash() {
        let base = Url::parse("http://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "relative/doc2.pdf"),
            "http://example.com/path/relative/doc2.pdf"
        );
        assert_eq!(
            resolve_url(&base, "../another.pdf"),
            "http://example.com/another.pdf"
        );
    }

    #[test]
    fn test_resolve_url_without_trailing_slash() {
        let base = Url::parse("http://example.com/path").unwrap();
        assert_eq!(
            resolve_url(&base, "relative/doc2.pdf"),
            "http://example.com/relative/doc2.pdf"
        );
        assert_eq!(
            resolve_url(&base, "/root.pdf"),
            "http://example.com/root.pdf"
        );
    }

    #[test]
    fn test_resolve_url_absolute_passthrough() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "https://other.com/x.pdf"),
            "https://other.com/x.pdf"
        );
    }

    #[test]
    fn test_is_pdf_link() {
        assert!(is_pdf_link("https://example.com/doc.pdf"));
        assert!(is_pdf_link("https://example.com/DOC.PDF"));
        assert!(is_pdf_link("https://example.com/doc.pdf?version=2"));
        assert!(!is_pdf_link("https://example.com/page.html"));
        assert!(!is_pdf_link("https://example.com/doc.pdf.html"));
        assert!(!is_pdf_link("https://example.com/pdf/index.html"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Title\n\t with   gaps "), "Title with gaps");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn test_parse_selector_error() {
        let err = parse_selector("div[").unwrap_err();
        assert_eq!(err.kind(), "SelectorError");
        assert!(parse_selector("p.fs_p a[href]").is_ok());
    }
}
