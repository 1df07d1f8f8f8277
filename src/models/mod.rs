// src/models/mod.rs

//! Domain models for the notification bot.
//!
//! Sources and the items observed on them, notification payloads,
//! selector layouts and application configuration.

mod config;
mod document;
mod notification;
mod selectors;
mod source;

pub use config::{
    Config, HttpConfig, LoggingConfig, SlackConfig, StorageConfig, split_targets,
};
pub use document::{DocumentItem, LatestRecord, RecordLink};
pub use notification::Notification;
pub use selectors::{DocumentSelectors, RecordSelectors};
pub use source::{ExtractorId, SourceConfig, SourceKind};
