//! # Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. Compiled defaults (engine primitives)
//! 2. TOML file (`--config`, or `proxigraph.toml` in the working directory if present)
//! 3. `PROXIGRAPH_*` environment variables
//! 4. Command-line flags (applied by the CLI)
//!
//! ```toml
//! capacity = 50
//! batch_size = 10
//! anomaly_threshold = 10
//! history_limit = 10000
//! snapshot_path = "proxigraph.redb"
//! snapshot_backend = "redb"
//! snapshot_interval_secs = 60
//! metrics_interval_secs = 5
//! host = "127.0.0.1"
//! port = 8080
//! ```

use clap::ValueEnum;
use proxigraph_core::primitives::{
    DEFAULT_ANOMALY_THRESHOLD, DEFAULT_BATCH_SIZE, DEFAULT_CAPACITY, DEFAULT_HISTORY_LIMIT,
};
use proxigraph_core::{
    FileSnapshotStore, GraphError, MetricsSink, RedbSnapshotStore, Session, SessionConfig,
    SnapshotStore,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "proxigraph.toml";

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "PROXIGRAPH_";

// =============================================================================
// SNAPSHOT BACKEND
// =============================================================================

/// Where snapshots are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotBackend {
    /// Single binary file, replaced on every save.
    #[default]
    File,
    /// redb database; also stores every metrics sample.
    Redb,
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// Fully resolved application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Maximum number of nodes held at once.
    pub capacity: usize,
    /// Buffered records that trigger a flush.
    pub batch_size: usize,
    /// Default threshold of `GET /anomalies` and `status`.
    pub anomaly_threshold: usize,
    /// Metrics samples kept in memory; 0 keeps none.
    pub history_limit: usize,
    /// Snapshot location; no snapshots are saved or restored when unset.
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_backend: SnapshotBackend,
    /// Seconds between background snapshot saves; 0 disables.
    pub snapshot_interval_secs: u64,
    /// Seconds between background metrics samples; 0 disables.
    pub metrics_interval_secs: u64,
    /// Seed for generated coordinates.
    pub seed: Option<u64>,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            history_limit: DEFAULT_HISTORY_LIMIT,
            snapshot_path: None,
            snapshot_backend: SnapshotBackend::File,
            snapshot_interval_secs: 0,
            metrics_interval_secs: 0,
            seed: None,
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file, then the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `PROXIGRAPH_*` overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("CAPACITY") {
            self.capacity = parse_env("CAPACITY", &v)?;
        }
        if let Some(v) = var("BATCH_SIZE") {
            self.batch_size = parse_env("BATCH_SIZE", &v)?;
        }
        if let Some(v) = var("ANOMALY_THRESHOLD") {
            self.anomaly_threshold = parse_env("ANOMALY_THRESHOLD", &v)?;
        }
        if let Some(v) = var("HISTORY_LIMIT") {
            self.history_limit = parse_env("HISTORY_LIMIT", &v)?;
        }
        if let Some(v) = var("SNAPSHOT_PATH") {
            self.snapshot_path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = var("SNAPSHOT_BACKEND") {
            self.snapshot_backend =
                SnapshotBackend::from_str(&v, true).map_err(|_| ConfigError::InvalidEnv {
                    key: format!("{ENV_PREFIX}SNAPSHOT_BACKEND"),
                    value: v.clone(),
                })?;
        }
        if let Some(v) = var("SNAPSHOT_INTERVAL_SECS") {
            self.snapshot_interval_secs = parse_env("SNAPSHOT_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = var("METRICS_INTERVAL_SECS") {
            self.metrics_interval_secs = parse_env("METRICS_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = var("SEED") {
            self.seed = Some(parse_env("SEED", &v)?);
        }
        if let Some(v) = var("HOST") {
            self.host = v;
        }
        if let Some(v) = var("PORT") {
            self.port = parse_env("PORT", &v)?;
        }
        Ok(())
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Engine sizing derived from these settings.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            capacity: self.capacity,
            batch_size: self.batch_size,
            history_limit: Some(self.history_limit),
            seed: self.seed,
        }
    }

    #[must_use]
    pub fn snapshot_interval(&self) -> Option<Duration> {
        (self.snapshot_interval_secs > 0).then(|| Duration::from_secs(self.snapshot_interval_secs))
    }

    #[must_use]
    pub fn metrics_interval(&self) -> Option<Duration> {
        (self.metrics_interval_secs > 0).then(|| Duration::from_secs(self.metrics_interval_secs))
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open the configured snapshot store, if any.
    pub fn open_storage(&self) -> Result<Storage, GraphError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(Storage::default());
        };
        Ok(match self.snapshot_backend {
            SnapshotBackend::File => Storage {
                store: Some(Arc::new(FileSnapshotStore::new(path.clone()))),
                sink: None,
            },
            SnapshotBackend::Redb => {
                let redb = Arc::new(RedbSnapshotStore::open(path)?);
                Storage {
                    store: Some(redb.clone()),
                    sink: Some(redb),
                }
            }
        })
    }

    /// Build a session and restore the last saved snapshot into it.
    pub fn build_session(&self, storage: &Storage) -> Result<Session, GraphError> {
        let mut session = Session::with_config(self.session_config())?;
        if let Some(sink) = &storage.sink {
            session = session.with_metrics_sink(sink.clone());
        }
        if let Some(store) = &storage.store {
            let snapshot = store.load()?;
            if !snapshot.is_empty() {
                session.restore(snapshot);
            }
        }
        Ok(session)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
    })
}

// =============================================================================
// STORAGE HANDLES
// =============================================================================

/// Opened persistence targets.
#[derive(Clone, Default)]
pub struct Storage {
    pub store: Option<Arc<dyn SnapshotStore>>,
    pub sink: Option<Arc<dyn MetricsSink>>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("store", &self.store.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for GraphError {
    fn from(e: ConfigError) -> Self {
        GraphError::IoError(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_engine_primitives() {
        let config = AppConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.snapshot_interval().is_none());
        assert!(config.metrics_interval().is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig =
            toml::from_str("capacity = 50\nsnapshot_backend = \"redb\"\n").expect("parse");
        assert_eq!(config.capacity, 50);
        assert_eq!(config.snapshot_backend, SnapshotBackend::Redb);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn unknown_toml_key_rejected() {
        assert!(toml::from_str::<AppConfig>("capacityy = 3\n").is_err());
    }

    #[test]
    fn file_then_env_layering() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("proxigraph.toml");
        fs::write(&path, "capacity = 20\nbatch_size = 4\n").expect("write");

        let mut config = AppConfig::from_file(&path).expect("load");
        config
            .apply_env(env(&[
                ("PROXIGRAPH_CAPACITY", "30"),
                ("PROXIGRAPH_METRICS_INTERVAL_SECS", "5"),
            ]))
            .expect("env");

        assert_eq!(config.capacity, 30);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.metrics_interval(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("PROXIGRAPH_PORT", "eighty")]))
            .expect_err("should fail");
        assert!(err.to_string().contains("PROXIGRAPH_PORT"));
    }

    #[test]
    fn zero_capacity_fails_validation() {
        let config = AppConfig {
            capacity: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/proxigraph.toml"))
            .expect_err("should fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn no_snapshot_path_means_no_storage() {
        let storage = AppConfig::default().open_storage().expect("storage");
        assert!(storage.store.is_none());
        assert!(storage.sink.is_none());
    }

    #[test]
    fn build_session_restores_saved_snapshot() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = AppConfig {
            snapshot_path: Some(temp.path().join("graph.redb")),
            snapshot_backend: SnapshotBackend::Redb,
            seed: Some(1),
            ..AppConfig::default()
        };
        let storage = config.open_storage().expect("storage");

        let mut first = config.build_session(&storage).expect("session");
        first
            .submit(serde_json::json!({"event": "add_node"}))
            .expect("submit");
        first.flush().expect("flush");
        storage
            .store
            .as_ref()
            .expect("store")
            .save(&first.snapshot())
            .expect("save");

        let second = config.build_session(&storage).expect("session");
        assert_eq!(second.snapshot(), first.snapshot());
        assert!(second.metrics_sink().is_some());
    }
}
