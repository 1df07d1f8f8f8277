//! Items observed on monitored pages.

use serde::{Deserialize, Serialize};

/// A downloadable document listed on a document-list page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentItem {
    /// Publication date as displayed on the page
    pub date: String,

    /// Document title (link text)
    pub title: String,

    /// Absolute document URL; the deduplication key
    pub url: String,
}

impl DocumentItem {
    pub fn new(date: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A secondary link attached to a record (minutes, materials).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordLink {
    pub url: String,
    pub label: String,
}

/// The most recent row of a single-latest-record page.
///
/// On the wire each link flattens into `<name>_url` / `<name>_text` keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "LatestRecordWire", into = "LatestRecordWire")]
pub struct LatestRecord {
    /// Identity of the record, e.g. the meeting number "第607回"
    pub id: String,

    /// Date as displayed on the page
    pub date: String,

    /// Agenda items in page order
    pub topics: Vec<String>,

    /// Link to the minutes, once published
    pub minutes: Option<RecordLink>,

    /// Link to the meeting materials
    pub materials: Option<RecordLink>,
}

#[derive(Serialize, Deserialize)]
struct LatestRecordWire {
    id: String,
    date: String,
    topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minutes_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minutes_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    materials_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    materials_text: Option<String>,
}

fn split_link(link: Option<RecordLink>) -> (Option<String>, Option<String>) {
    match link {
        Some(RecordLink { url, label }) => (Some(url), Some(label)),
        None => (None, None),
    }
}

fn join_link(url: Option<String>, text: Option<String>) -> Option<RecordLink> {
    url.map(|url| RecordLink {
        url,
        label: text.unwrap_or_default(),
    })
}

impl From<LatestRecord> for LatestRecordWire {
    fn from(record: LatestRecord) -> Self {
        let (minutes_url, minutes_text) = split_link(record.minutes);
        let (materials_url, materials_text) = split_link(record.materials);
        Self {
            id: record.id,
            date: record.date,
            topics: record.topics,
            minutes_url,
            minutes_text,
            materials_url,
            materials_text,
        }
    }
}

impl From<LatestRecordWire> for LatestRecord {
    fn from(wire: LatestRecordWire) -> Self {
        Self {
            id: wire.id,
            date: wire.date,
            topics: wire.topics,
            minutes: join_link(wire.minutes_url, wire.minutes_text),
            materials: join_link(wire.materials_url, wire.materials_text),
        }
    }
}

impl LatestRecord {
    /// Secondary links in display order (materials first, then minutes).
    pub fn links(&self) -> impl Iterator<Item = &RecordLink> {
        self.materials.iter().chain(self.minutes.iter())
    }
}
