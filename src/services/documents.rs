// src/services/documents.rs

//! Document-list extraction.

use std::collections::HashSet;

use scraper::{ElementRef, Html};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{DocumentItem, DocumentSelectors};
use crate::services::DocumentExtractor;
use crate::utils::{is_pdf_link, normalize_whitespace, parse_selector, resolve_url};

/// Reads dated PDF links out of a repeated row layout.
#[derive(Debug, Clone, Default)]
pub struct DocumentListExtractor {
    selectors: DocumentSelectors,
}

impl DocumentListExtractor {
    pub fn new(selectors: DocumentSelectors) -> Self {
        Self { selectors }
    }

    /// First link in the row that resolves to a PDF.
    fn pdf_link<'a>(
        &self,
        row: ElementRef<'a>,
        link_sel: &scraper::Selector,
        base: &Url,
    ) -> Option<(ElementRef<'a>, String)> {
        row.select(link_sel).find_map(|anchor| {
            let href = anchor.value().attr(&self.selectors.attr_name)?.trim();
            if href.is_empty() {
                return None;
            }
            let url = resolve_url(base, href);
            is_pdf_link(&url).then_some((anchor, url))
        })
    }
}

impl DocumentExtractor for DocumentListExtractor {
    fn extract(&self, html: &str, base_url: &str) -> Result<Vec<DocumentItem>> {
        let base = Url::parse(base_url)
            .map_err(|e| AppError::extract(base_url, format!("invalid base URL: {e}")))?;
        let row_sel = parse_selector(&self.selectors.row_selector)?;
        let date_sel = parse_selector(&self.selectors.date_selector)?;
        let link_sel = parse_selector(&self.selectors.link_selector)?;

        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for (index, row) in document.select(&row_sel).enumerate() {
            let date = row
                .select(&date_sel)
                .next()
                .map(|el| normalize_whitespace(&el.text().collect::<String>()))
                .filter(|date| !date.is_empty());
            let Some(date) = date else {
                log::debug!("Row {} on {} has no date; skipped", index, base_url);
                continue;
            };

            let Some((anchor, url)) = self.pdf_link(row, &link_sel, &base) else {
                log::debug!("Row {} on {} has no PDF link; skipped", index, base_url);
                continue;
            };

            let title = normalize_whitespace(&anchor.text().collect::<String>());
            if title.is_empty() {
                log::debug!("Row {} on {} has an empty title; skipped", index, base_url);
                continue;
            }

            if !seen.insert(url.clone()) {
                log::debug!("Duplicate document {} on {}", url, base_url);
                continue;
            }

            items.push(DocumentItem::new(date, title, url));
        }

        log::info!("Extracted {} document(s) from {}", items.len(), base_url);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.hospital.or.jp/site/ministry/";

    const LISTING: &str = r#"
<html><body>
 <div class="col-12 isotope-item">
   <div class="fs13">2025.04.19</div>
   <div><p class="fs_p ic_140"><a href="known.pdf">Known PDF</a></p></div>
 </div>
 <div class="col-12 isotope-item">
   <div class="fs13">2025.04.20</div>
   <div><p class="fs_p ic_140"><a href="/files/NEW.PDF?v=2">
     New
     PDF
   </a></p></div>
 </div>
</body></html>
"#;

    fn extract(html: &str) -> Vec<DocumentItem> {
        DocumentListExtractor::default().extract(html, BASE).unwrap()
    }

    #[test]
    fn test_extracts_rows_in_page_order() {
        let items = extract(LISTING);
        assert_eq!(
            items,
            vec![
                DocumentItem::new(
                    "2025.04.19",
                    "Known PDF",
                    "https://www.hospital.or.jp/site/ministry/known.pdf"
                ),
                DocumentItem::new(
                    "2025.04.20",
                    "New PDF",
                    "https://www.hospital.or.jp/files/NEW.PDF?v=2"
                ),
            ]
        );
    }

    #[test]
    fn test_malformed_rows_yield_nothing() {
        let html = r#"
<div class="isotope-item">
  <p class="fs_p"><a href="no-date.pdf">No date</a></p>
</div>
<div class="isotope-item">
  <div class="fs13">2025.04.21</div>
</div>
<div class="isotope-item">
  <div class="fs13">2025.04.22</div>
  <p class="fs_p"><a href="page.html">Not a PDF</a></p>
</div>
<div class="isotope-item">
  <div class="fs13">2025.04.23</div>
  <p class="fs_p"><a>No href</a></p>
</div>
<div class="isotope-item">
  <div class="fs13">2025.04.24</div>
  <p class="fs_p"><a href="untitled.pdf">   </a></p>
</div>
<div class="isotope-item"><div class="fs13">2025.04
"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn test_empty_and_unrelated_pages() {
        assert!(extract("").is_empty());
        assert!(extract("<html><body><p>No links here.</p></body></html>").is_empty());
    }

    #[test]
    fn test_first_pdf_link_in_row_wins() {
        let html = r#"
<div class="isotope-item">
  <div class="fs13">2025.05.01</div>
  <p class="fs_p"><a href="index.html">Overview</a> <a href="a.pdf">First</a> <a href="b.pdf">Second</a></p>
</div>"#;
        let items = extract(html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "First");
    }

    #[test]
    fn test_duplicate_urls_keep_first() {
        let html = r#"
<div class="isotope-item"><div class="fs13">2025.05.01</div>
  <p class="fs_p"><a href="same.pdf">Original</a></p></div>
<div class="isotope-item"><div class="fs13">2025.05.02</div>
  <p class="fs_p"><a href="https://www.hospital.or.jp/site/ministry/same.pdf">Repost</a></p></div>
"#;
        let items = extract(html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Original");
        assert_eq!(items[0].date, "2025.05.01");
    }

    #[test]
    fn test_relative_links_follow_base_slash() {
        let html = r#"<div class="isotope-item"><div class="fs13">d</div>
  <p class="fs_p"><a href="relative/doc2.pdf">Doc</a></p></div>"#;
        let extractor = DocumentListExtractor::default();

        let with_slash = extractor.extract(html, "http://example.com/path/").unwrap();
        assert_eq!(with_slash[0].url, "http://example.com/path/relative/doc2.pdf");

        let without_slash = extractor.extract(html, "http://example.com/path").unwrap();
        assert_eq!(without_slash[0].url, "http://example.com/relative/doc2.pdf");
    }

    #[test]
    fn test_hard_failures() {
        let bad_base = DocumentListExtractor::default().extract(LISTING, "not a url");
        assert!(matches!(bad_base, Err(AppError::Extract { .. })));

        let bad_selector = DocumentListExtractor::new(DocumentSelectors {
            row_selector: "div[".to_string(),
            ..DocumentSelectors::default()
        })
        .extract(LISTING, BASE);
        assert!(matches!(bad_selector, Err(AppError::Selector { .. })));
    }
}
