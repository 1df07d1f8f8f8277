//! Notification payloads handed to a notifier.

use serde::Serialize;

use crate::models::{DocumentItem, LatestRecord};

/// Something new worth telling the main channel about.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Notification {
    /// New documents appeared on a document-list page.
    #[serde(rename = "pdf")]
    Documents {
        #[serde(rename = "data")]
        documents: Vec<DocumentItem>,
        source: String,
    },

    /// A new latest record appeared on a single-latest-record page.
    #[serde(rename = "meeting")]
    Meeting {
        #[serde(rename = "data")]
        record: LatestRecord,
        source: String,
    },
}

impl Notification {
    /// URL of the page the notification came from.
    pub fn source(&self) -> &str {
        match self {
            Notification::Documents { source, .. } | Notification::Meeting { source, .. } => {
                source
            }
        }
    }

    /// Number of new items carried.
    pub fn item_count(&self) -> usize {
        match self {
            Notification::Documents { documents, .. } => documents.len(),
            Notification::Meeting { .. } => 1,
        }
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        match self {
            Notification::Documents { documents, source } => {
                format!("{} new document(s) from {}", documents.len(), source)
            }
            Notification::Meeting { record, source } => {
                format!("new meeting {} from {}", record.id, source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordLink;

    #[test]
    fn test_documents_wire_shape() {
        let notification = Notification::Documents {
            documents: vec![DocumentItem::new(
                "2025.04.20",
                "New PDF",
                "https://www.hospital.or.jp/site/ministry/new.pdf",
            )],
            source: "https://www.hospital.or.jp/site/ministry/".to_string(),
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "pdf");
        assert_eq!(json["data"][0]["title"], "New PDF");
        assert_eq!(json["source"], "https://www.hospital.or.jp/site/ministry/");
        assert_eq!(notification.item_count(), 1);
    }

    #[test]
    fn test_meeting_wire_shape() {
        let notification = Notification::Meeting {
            record: LatestRecord {
                id: "第607回".to_string(),
                date: "2025年4月23日".to_string(),
                topics: vec!["New Topic".to_string()],
                minutes: Some(RecordLink {
                    url: "https://m/min".to_string(),
                    label: "議事録".to_string(),
                }),
                materials: Some(RecordLink {
                    url: "https://m/mat".to_string(),
                    label: "資料".to_string(),
                }),
            },
            source: "https://www.mhlw.go.jp/stf/shingi/shingi-chuo_128154.html".to_string(),
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "meeting");
        assert_eq!(json["data"]["id"], "第607回");
        assert_eq!(json["data"]["topics"][0], "New Topic");
        assert_eq!(json["data"]["minutes_url"], "https://m/min");
        assert_eq!(json["data"]["minutes_text"], "議事録");
        assert_eq!(json["data"]["materials_url"], "https://m/mat");
        assert_eq!(json["data"]["materials_text"], "資料");
        assert!(json["data"].get("minutes").is_none());
        assert_eq!(
            notification.summary(),
            format!("new meeting 第607回 from {}", notification.source())
        );
    }
}
