//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ExtractorId, SourceConfig};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URLs to check on every run
    #[serde(default = "defaults::targets")]
    pub targets: Vec<String>,

    /// URL to adapter mapping; targets missing here are ignored
    #[serde(default = "defaults::sources")]
    pub sources: Vec<SourceConfig>,

    /// Slack delivery settings
    #[serde(default)]
    pub slack: SlackConfig,

    /// Where reconciliation state is persisted
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP fetching behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Empty values count as unset. Numbers that fail to parse are logged
    /// and ignored so a typo never silently zeroes a timeout.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_any = |keys: &[&str]| keys.iter().find_map(|key| get(key));

        if let Some(targets) = get("TARGET_URLS") {
            self.targets = split_targets(&targets);
        }

        if let Some(token) = get_any(&["SLACK_API_TOKEN", "SLACK_BOT_TOKEN"]) {
            self.slack.token = token;
        }
        if let Some(channel) = get("SLACK_CHANNEL_ID") {
            self.slack.channel_id = channel;
        }
        if let Some(admin) = get_any(&["ADMIN_SLACK_CHANNEL_ID", "SLACK_ADMIN_CHANNEL_ID"]) {
            self.slack.admin_channel_id = Some(admin);
        }

        if let Some(bucket) = get("S3_BUCKET") {
            self.storage.bucket = Some(bucket);
        }
        if let Some(prefix) = get("S3_PREFIX") {
            self.storage.prefix = prefix;
        }
        if let Some(dir) = get("DATA_DIR") {
            self.storage.data_dir = dir;
        }
        if let Some(key) = get("KNOWN_URLS_FILE") {
            self.storage.known_urls_key = key;
        }
        if let Some(key) = get("LATEST_IDS_FILE") {
            self.storage.latest_ids_key = key;
        }

        if let Some(secs) = parse_env(get("REQUEST_TIMEOUT"), "REQUEST_TIMEOUT") {
            self.http.timeout_secs = secs;
        }
        if let Some(retries) = parse_env(get("REQUEST_RETRIES"), "REQUEST_RETRIES") {
            self.http.retries = retries;
        }
        if let Some(secs) = parse_env(get("REQUEST_RETRY_DELAY"), "REQUEST_RETRY_DELAY") {
            self.http.retry_delay_secs = secs;
        }

        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(AppError::validation("No target URLs configured"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.retries == 0 {
            return Err(AppError::validation("http.retries must be >= 1"));
        }
        if self.storage.known_urls_key.trim().is_empty()
            || self.storage.latest_ids_key.trim().is_empty()
        {
            return Err(AppError::validation("storage keys must not be empty"));
        }
        if self.storage.known_urls_key == self.storage.latest_ids_key {
            return Err(AppError::validation(
                "storage.known_urls_key and storage.latest_ids_key must differ",
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            url::Url::parse(&source.url).map_err(|e| {
                AppError::validation(format!("Invalid source URL '{}': {}", source.url, e))
            })?;
            if !seen.insert(source.url.as_str()) {
                return Err(AppError::validation(format!(
                    "Source URL mapped twice: {}",
                    source.url
                )));
            }
        }
        Ok(())
    }

    /// Targets that have a mapping entry, in target order.
    ///
    /// Unmapped targets are logged and skipped; duplicates are checked once.
    pub fn resolved_sources(&self) -> Vec<SourceConfig> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for target in &self.targets {
            let target = target.trim();
            if !seen.insert(target) {
                continue;
            }
            match self.sources.iter().find(|s| s.url == target) {
                Some(source) => resolved.push(source.clone()),
                None => log::warn!("No extractor mapped for {}; ignoring it", target),
            }
        }
        resolved
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: defaults::targets(),
            sources: defaults::sources(),
            slack: SlackConfig::default(),
            storage: StorageConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Slack Web API settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlackConfig {
    /// Bot token used for chat.postMessage
    #[serde(default)]
    pub token: String,

    /// Channel receiving new-item notifications
    #[serde(default)]
    pub channel_id: String,

    /// Channel receiving operational alerts; alerts are skipped when unset
    #[serde(default)]
    pub admin_channel_id: Option<String>,
}

impl SlackConfig {
    /// Check that the main delivery settings are present.
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::validation("Slack token is not set"));
        }
        if self.channel_id.trim().is_empty() {
            return Err(AppError::validation("Slack channel id is not set"));
        }
        Ok(())
    }
}

/// State persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// S3 bucket; when set, state lives in object storage
    #[serde(default)]
    pub bucket: Option<String>,

    /// Key prefix inside the bucket
    #[serde(default)]
    pub prefix: String,

    /// Local directory used when no bucket is set
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,

    /// Object/file name of the known-URLs document
    #[serde(default = "defaults::known_urls_key")]
    pub known_urls_key: String,

    /// Object/file name of the latest-ids document
    #[serde(default = "defaults::latest_ids_key")]
    pub latest_ids_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: String::new(),
            data_dir: defaults::data_dir(),
            known_urls_key: defaults::known_urls_key(),
            latest_ids_key: defaults::latest_ids_key(),
        }
    }
}

/// HTTP client and fetching behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Total attempts per page before giving up
    #[serde(default = "defaults::retries")]
    pub retries: u32,

    /// Fixed delay between attempts in seconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            retries: defaults::retries(),
            retry_delay_secs: defaults::retry_delay(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl LoggingConfig {
    /// Parse the configured level, accepting Python-style aliases.
    pub fn level_filter(&self) -> log::LevelFilter {
        let level = self.level.trim().to_lowercase();
        let level = match level.as_str() {
            "warning" => "warn",
            "critical" | "fatal" => "error",
            other => other,
        };
        log::LevelFilter::from_str(level).unwrap_or(log::LevelFilter::Info)
    }

    /// Level to run at; `verbose` forces debug.
    pub fn effective_level(&self, verbose: bool) -> log::LevelFilter {
        if verbose {
            log::LevelFilter::Debug
        } else {
            self.level_filter()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Split a comma-separated target list, dropping blanks.
pub fn split_targets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T: FromStr>(value: Option<String>, key: &str) -> Option<T> {
    let value = value?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid number", key, value);
            None
        }
    }
}

mod defaults {
    use super::{ExtractorId, SourceConfig};

    pub const HOSPITAL_MINISTRY_URL: &str = "https://www.hospital.or.jp/site/ministry/";
    pub const CHUIKYO_URL: &str = "https://www.mhlw.go.jp/stf/shingi/shingi-chuo_128154.html";

    pub fn targets() -> Vec<String> {
        vec![HOSPITAL_MINISTRY_URL.to_string(), CHUIKYO_URL.to_string()]
    }

    pub fn sources() -> Vec<SourceConfig> {
        vec![
            SourceConfig::new(HOSPITAL_MINISTRY_URL, ExtractorId::HospitalDocuments)
                .with_name("日本病院会 厚生労働省通知"),
            SourceConfig::new(CHUIKYO_URL, ExtractorId::ChuikyoMeetings)
                .with_name("中央社会保険医療協議会 総会"),
        ]
    }

    // Storage defaults
    pub fn data_dir() -> String {
        "data".into()
    }
    pub fn known_urls_key() -> String {
        "known_urls.json".into()
    }
    pub fn latest_ids_key() -> String {
        "latest_ids.json".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; medfeebot/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn retries() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        5
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
