//! Persistence for reconciliation state.
//!
//! Two independent JSON documents live under a backend:
//!
//! ```text
//! {root or s3://bucket/prefix}/
//! ├── known_urls.json   # source url -> sorted document urls seen so far
//! └── latest_ids.json   # source url -> last notified record id
//! ```
//!
//! Backends only move bytes. [`StateStore`] owns the decoding rules:
//! a missing document is a first run, a corrupt one is treated as empty,
//! and an unreachable backend is an error the caller must handle.

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{AppError, Result};
use crate::models::StorageConfig;

pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// Source URL -> every document URL seen on it.
pub type KnownUrls = BTreeMap<String, BTreeSet<String>>;

/// Source URL -> id of the last notified record.
pub type LatestIds = BTreeMap<String, String>;

/// Byte-level key/value transport.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// `Ok(None)` when the key does not exist; `Err` when the backend
    /// could not be reached or read.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value stored under `key`.
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Human-readable location of a key, for logs and alerts.
    fn describe(&self, key: &str) -> String;
}

/// Typed access to the two state documents.
#[derive(Clone)]
pub struct StateStore {
    backend: Arc<dyn StateBackend>,
    known_urls_key: String,
    latest_ids_key: String,
}

impl StateStore {
    pub fn new(
        backend: Arc<dyn StateBackend>,
        known_urls_key: impl Into<String>,
        latest_ids_key: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            known_urls_key: known_urls_key.into(),
            latest_ids_key: latest_ids_key.into(),
        }
    }

    pub fn from_config(backend: Arc<dyn StateBackend>, config: &StorageConfig) -> Self {
        Self::new(backend, &config.known_urls_key, &config.latest_ids_key)
    }

    pub fn known_urls_location(&self) -> String {
        self.backend.describe(&self.known_urls_key)
    }

    pub fn latest_ids_location(&self) -> String {
        self.backend.describe(&self.latest_ids_key)
    }

    pub async fn load_known_urls(&self) -> Result<KnownUrls> {
        self.load(&self.known_urls_key).await
    }

    pub async fn load_latest_ids(&self) -> Result<LatestIds> {
        self.load(&self.latest_ids_key).await
    }

    /// Persist the whole known-URLs map; reports whether the write landed.
    pub async fn save_known_urls(&self, known: &KnownUrls) -> bool {
        self.save(&self.known_urls_key, known).await
    }

    /// Persist the whole latest-ids map; reports whether the write landed.
    pub async fn save_latest_ids(&self, latest: &LatestIds) -> bool {
        self.save(&self.latest_ids_key, latest).await
    }

    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let location = self.backend.describe(key);
        let bytes = match self.backend.read_bytes(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!("No state at {} yet; starting empty", location);
                return Ok(T::default());
            }
            Err(e) => {
                log::error!("State backend unavailable at {}: {}", location, e);
                return Err(AppError::state_unavailable(location, e));
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => {
                log::debug!("Loaded state from {}", location);
                Ok(state)
            }
            Err(e) => {
                log::error!("Corrupt state at {} ({}); starting empty", location, e);
                Ok(T::default())
            }
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let location = self.backend.describe(key);
        let bytes = match serde_json::to_vec_pretty(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Failed to encode state for {}: {}", location, e);
                return false;
            }
        };

        match self.backend.write_bytes(key, &bytes).await {
            Ok(()) => {
                log::info!("Saved state to {}", location);
                true
            }
            Err(e) => {
                log::error!("Failed to save state to {}: {}", location, e);
                false
            }
        }
    }
}

/// Open the backend selected by configuration: S3 when a bucket is set,
/// the local data directory otherwise.
pub async fn open_backend(config: &StorageConfig) -> Result<Arc<dyn StateBackend>> {
    match config.bucket.as_deref() {
        Some(bucket) => open_s3(bucket, &config.prefix).await,
        None => {
            log::info!("Using local state directory {}", config.data_dir);
            Ok(Arc::new(LocalStorage::new(&config.data_dir)))
        }
    }
}

/// Open the configured backend and wrap it in a [`StateStore`].
pub async fn open_state_store(config: &StorageConfig) -> Result<StateStore> {
    let backend = open_backend(config).await?;
    Ok(StateStore::from_config(backend, config))
}

#[cfg(feature = "s3")]
async fn open_s3(bucket: &str, prefix: &str) -> Result<Arc<dyn StateBackend>> {
    log::info!("Using S3 state bucket {}", bucket);
    Ok(Arc::new(S3Storage::from_env(bucket, prefix).await))
}

#[cfg(not(feature = "s3"))]
async fn open_s3(bucket: &str, _prefix: &str) -> Result<Arc<dyn StateBackend>> {
    Err(AppError::config(format!(
        "S3 bucket '{}' is configured but this build lacks the `s3` feature",
        bucket
    )))
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// In-memory backend that counts writes and can fail reads or writes.
    #[derive(Default)]
    pub(crate) struct MemoryBackend {
        data: Mutex<HashMap<String, Vec<u8>>>,
        writes: AtomicUsize,
        failing_reads: AtomicUsize,
        failing_writes: AtomicBool,
    }

    impl MemoryBackend {
        pub(crate) fn with_json(self, key: &str, value: serde_json::Value) -> Self {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string().into_bytes());
            self
        }

        pub(crate) fn fail_next_reads(&self, count: usize) {
            self.failing_reads.store(count, Ordering::SeqCst);
        }

        /// Every later write fails; reads keep working.
        pub(crate) fn fail_writes(self) -> Self {
            self.failing_writes.store(true, Ordering::SeqCst);
            self
        }

        pub(crate) fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub(crate) fn json(&self, key: &str) -> Option<serde_json::Value> {
            let data = self.data.lock().unwrap();
            data.get(key)
                .map(|bytes| serde_json::from_slice(bytes).unwrap())
        }
    }

    #[async_trait]
    impl StateBackend for MemoryBackend {
        async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
            let failing = self.failing_reads.load(Ordering::SeqCst);
            if failing > 0 {
                self.failing_reads.store(failing - 1, Ordering::SeqCst);
                return Err(AppError::S3("timed out".to_string()));
            }
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.failing_writes.load(Ordering::SeqCst) {
                return Err(AppError::S3("access denied".to_string()));
            }
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), bytes.to_vec());
            Ok(())
        }

        fn describe(&self, key: &str) -> String {
            format!("memory://{}", key)
        }
    }

    /// Backend whose every call fails, like an unreachable bucket.
    pub(crate) struct UnavailableBackend;

    #[async_trait]
    impl StateBackend for UnavailableBackend {
        async fn read_bytes(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(AppError::S3("dispatch failure".to_string()))
        }

        async fn write_bytes(&self, _key: &str, _bytes: &[u8]) -> Result<()> {
            Err(AppError::S3("dispatch failure".to_string()))
        }

        fn describe(&self, key: &str) -> String {
            format!("s3://unreachable/{}", key)
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::fakes::UnavailableBackend;
    use super::*;

    fn local_store(dir: &TempDir) -> StateStore {
        StateStore::new(
            Arc::new(LocalStorage::new(dir.path())),
            "known_urls.json",
            "latest_ids.json",
        )
    }

    #[tokio::test]
    async fn test_missing_state_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = local_store(&tmp);

        assert!(store.load_known_urls().await.unwrap().is_empty());
        assert!(store.load_latest_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_state_is_empty() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("known_urls.json"), b"{not json").unwrap();
        std::fs::write(tmp.path().join("latest_ids.json"), b"[\"wrong\", \"shape\"]").unwrap();
        let store = local_store(&tmp);

        assert!(store.load_known_urls().await.unwrap().is_empty());
        assert!(store.load_latest_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_error() {
        let store = StateStore::new(Arc::new(UnavailableBackend), "k.json", "l.json");

        let err = store.load_known_urls().await.unwrap_err();
        match err {
            AppError::StateUnavailable { location, .. } => {
                assert_eq!(location, "s3://unreachable/k.json")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.load_latest_ids().await.is_err());
    }

    #[tokio::test]
    async fn test_save_failure_is_swallowed() {
        let store = StateStore::new(Arc::new(UnavailableBackend), "k.json", "l.json");
        let mut latest = LatestIds::new();
        latest.insert("https://s/".to_string(), "第607回".to_string());

        assert!(!store.save_latest_ids(&latest).await);
    }

    #[tokio::test]
    async fn test_saved_state_is_sorted_and_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = local_store(&tmp);

        let mut known = KnownUrls::new();
        known.entry("https://z/".to_string()).or_default().extend([
            "https://z/b.pdf".to_string(),
            "https://z/a.pdf".to_string(),
        ]);
        known.insert("https://a/".to_string(), BTreeSet::new());
        assert!(store.save_known_urls(&known).await);

        let raw = std::fs::read_to_string(tmp.path().join("known_urls.json")).unwrap();
        let a_source = raw.find("\"https://a/\"").unwrap();
        let z_source = raw.find("\"https://z/\"").unwrap();
        let a_pdf = raw.find("https://z/a.pdf").unwrap();
        let b_pdf = raw.find("https://z/b.pdf").unwrap();
        assert!(a_source < z_source);
        assert!(a_pdf < b_pdf);

        assert_eq!(store.load_known_urls().await.unwrap(), known);
    }

    #[tokio::test]
    async fn test_open_backend_defaults_to_local() {
        let tmp = TempDir::new().unwrap();
        let config = StorageConfig {
            data_dir: tmp.path().to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };

        let store = open_state_store(&config).await.unwrap();
        assert!(store.known_urls_location().ends_with("known_urls.json"));
        assert!(store.load_latest_ids().await.unwrap().is_empty());
    }
}
