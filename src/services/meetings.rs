// src/services/meetings.rs

//! Latest-record extraction from meeting tables.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{LatestRecord, RecordLink, RecordSelectors};
use crate::services::RecordExtractor;
use crate::utils::{normalize_whitespace, parse_selector, resolve_url};

const MINUTES_LABEL: &str = "議事録";
const MATERIALS_LABEL: &str = "資料";

/// Reads the first complete row of a meeting table.
#[derive(Debug, Clone, Default)]
pub struct MeetingTableExtractor {
    selectors: RecordSelectors,
}

impl MeetingTableExtractor {
    pub fn new(selectors: RecordSelectors) -> Self {
        Self { selectors }
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    normalize_whitespace(&cell.text().collect::<String>())
}

/// List items when the cell has a list, otherwise its non-empty text lines.
fn cell_topics(cell: ElementRef<'_>, topic_sel: &Selector) -> Vec<String> {
    let items: Vec<String> = cell
        .select(topic_sel)
        .map(cell_text)
        .filter(|topic| !topic.is_empty())
        .collect();
    if !items.is_empty() {
        return items;
    }

    cell.text()
        .flat_map(str::lines)
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

fn cell_link(
    cell: Option<&ElementRef<'_>>,
    link_sel: &Selector,
    base: &Url,
    fallback_label: &str,
) -> Option<RecordLink> {
    let anchor = cell?.select(link_sel).next()?;
    let href = anchor.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }

    let label = cell_text(anchor);
    Some(RecordLink {
        url: resolve_url(base, href),
        label: if label.is_empty() {
            fallback_label.to_string()
        } else {
            label
        },
    })
}

impl RecordExtractor for MeetingTableExtractor {
    fn extract(&self, html: &str, base_url: &str) -> Result<Option<LatestRecord>> {
        let base = Url::parse(base_url)
            .map_err(|e| AppError::extract(base_url, format!("invalid base URL: {e}")))?;
        let row_sel = parse_selector(&self.selectors.row_selector)?;
        let cell_sel = parse_selector(&self.selectors.cell_selector)?;
        let topic_sel = parse_selector(&self.selectors.topic_selector)?;
        let link_sel = parse_selector(&self.selectors.link_selector)?;
        let required = self.selectors.required_cells();

        let document = Html::parse_document(html);

        for (index, row) in document.select(&row_sel).enumerate() {
            let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
            if cells.len() < required {
                log::debug!(
                    "Row {} on {} has {} cell(s), need {}; skipped",
                    index,
                    base_url,
                    cells.len(),
                    required
                );
                continue;
            }

            let id = cell_text(cells[self.selectors.id_cell]);
            let date = cell_text(cells[self.selectors.date_cell]);
            let topics = cell_topics(cells[self.selectors.topics_cell], &topic_sel);
            if id.is_empty() || date.is_empty() || topics.is_empty() {
                log::debug!("Row {} on {} is incomplete; skipped", index, base_url);
                continue;
            }

            let minutes = cell_link(
                cells.get(self.selectors.minutes_cell),
                &link_sel,
                &base,
                MINUTES_LABEL,
            );
            let materials = cell_link(
                cells.get(self.selectors.materials_cell),
                &link_sel,
                &base,
                MATERIALS_LABEL,
            );

            log::info!("Latest record on {}: {} ({})", base_url, id, date);
            return Ok(Some(LatestRecord {
                id,
                date,
                topics,
                minutes,
                materials,
            }));
        }

        log::info!("No qualifying record found on {}", base_url);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.mhlw.go.jp/stf/shingi/shingi-chuo_128154.html";

    fn extract(html: &str) -> Option<LatestRecord> {
        MeetingTableExtractor::default().extract(html, BASE).unwrap()
    }

    #[test]
    fn test_latest_meeting_with_materials_only() {
        let html = r#"
<html><body>
<table class="m-tableFlex">
  <tbody>
    <tr>
      <td> 第607回 </td><td> 2025年4月23日 </td><td> <ol><li>New Topic</li></ol> </td>
      <td></td><td><a href="new_material.pdf" class="m-link">資料</a></td>
    </tr>
    <tr>
      <td> 第606回 </td><td> 2025年4月09日 </td><td> <ol><li>Old Topic</li></ol> </td>
      <td></td><td><a href="old_material.pdf" class="m-link">資料</a></td>
    </tr>
  </tbody>
</table>
</body></html>"#;

        let record = extract(html).unwrap();
        assert_eq!(record.id, "第607回");
        assert_eq!(record.date, "2025年4月23日");
        assert_eq!(record.topics, vec!["New Topic"]);
        assert!(record.minutes.is_none());
        assert_eq!(
            record.materials,
            Some(RecordLink {
                url: "https://www.mhlw.go.jp/stf/shingi/new_material.pdf".to_string(),
                label: "資料".to_string(),
            })
        );
    }

    #[test]
    fn test_skips_short_and_incomplete_rows() {
        let html = r#"
<table class="m-tableFlex"><tbody>
  <tr><td colspan="5">令和7年度</td></tr>
  <tr><td>第608回</td><td></td><td><ul><li>Pending</li></ul></td></tr>
  <tr>
    <td>第605回</td><td>2025年3月26日</td>
    <td>議題A<br>
        議題B</td>
    <td><a href="/content/minutes605.html"></a></td>
  </tr>
</tbody></table>"#;

        let record = extract(html).unwrap();
        assert_eq!(record.id, "第605回");
        assert_eq!(record.topics, vec!["議題A", "議題B"]);
        assert_eq!(
            record.minutes,
            Some(RecordLink {
                url: "https://www.mhlw.go.jp/content/minutes605.html".to_string(),
                label: MINUTES_LABEL.to_string(),
            })
        );
        assert!(record.materials.is_none());
    }

    #[test]
    fn test_no_table_is_none() {
        assert!(extract("").is_none());
        assert!(extract("<table class=\"other\"><tr><td>1</td><td>2</td><td>3</td></tr></table>").is_none());
    }

    #[test]
    fn test_invalid_base_url_is_error() {
        let result = MeetingTableExtractor::default().extract("<table></table>", "::");
        assert!(matches!(result, Err(AppError::Extract { .. })));
    }
}
