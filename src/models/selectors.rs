// src/models/selectors.rs

//! CSS selectors for the built-in page adapters.

use serde::{Deserialize, Serialize};

/// Selectors for a page that lists documents one row at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSelectors {
    /// Selector for each row/item in the document list
    pub row_selector: String,

    /// Selector for the date element within a row
    pub date_selector: String,

    /// Selector for candidate link elements within a row
    pub link_selector: String,

    /// HTML attribute name for extracting links (usually "href")
    #[serde(default = "default_attr_name")]
    pub attr_name: String,
}

fn default_attr_name() -> String {
    "href".to_string()
}

impl Default for DocumentSelectors {
    /// Layout of the hospital association's ministry notice page.
    fn default() -> Self {
        Self {
            row_selector: "div.isotope-item".to_string(),
            date_selector: ".fs13".to_string(),
            link_selector: "p.fs_p a[href]".to_string(),
            attr_name: default_attr_name(),
        }
    }
}

/// Selectors for a table whose first qualifying row is the latest record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordSelectors {
    /// Selector for each table row
    pub row_selector: String,

    /// Selector for the cells of a row
    pub cell_selector: String,

    /// Selector for list items inside the topics cell
    pub topic_selector: String,

    /// Selector for the link inside the minutes/materials cells
    pub link_selector: String,

    /// Cell positions (0-based)
    pub id_cell: usize,
    pub date_cell: usize,
    pub topics_cell: usize,
    pub minutes_cell: usize,
    pub materials_cell: usize,
}

impl Default for RecordSelectors {
    /// Layout of the council meeting table on the ministry site.
    fn default() -> Self {
        Self {
            row_selector: "table.m-tableFlex tbody tr".to_string(),
            cell_selector: "td".to_string(),
            topic_selector: "li".to_string(),
            link_selector: "a[href]".to_string(),
            id_cell: 0,
            date_cell: 1,
            topics_cell: 2,
            minutes_cell: 3,
            materials_cell: 4,
        }
    }
}

impl RecordSelectors {
    /// Minimum number of cells a row needs to carry id, date and topics.
    pub fn required_cells(&self) -> usize {
        self.id_cell.max(self.date_cell).max(self.topics_cell) + 1
    }
}
