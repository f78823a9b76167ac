// ⚙️ Configuration - TOML file, every field defaulted
// An empty file (or no file) is a valid configuration. Example:
//
//   [store]
//   database_path = "simplefin.db"
//   busy_timeout_ms = 5000
//
//   [import]
//   workers = 4
//   on_missing_identity = "skip-entity"
//   run_timeout_secs = 120
//
//   [logging]
//   filter = "simplefin_reconcile=debug"

use crate::cancel::Cancellation;
use crate::error::{ImportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub import: ImportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_path: PathBuf::from("simplefin.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

/// What to do with the rest of an account when one of its children has a
/// blank identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingIdentityPolicy {
    /// Stop reconciling that account (siblings continue)
    #[default]
    AbortAccount,

    /// Skip only the offending child
    SkipEntity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Accounts reconciled in parallel (1 = sequential)
    pub workers: usize,
    pub on_missing_identity: MissingIdentityPolicy,

    /// Whole-run deadline; None = no deadline
    pub run_timeout_secs: Option<u64>,
}

impl ImportConfig {
    /// Fresh cancellation signal honouring `run_timeout_secs`
    pub fn cancellation(&self) -> Cancellation {
        match self.run_timeout_secs {
            Some(secs) => Cancellation::with_timeout(Duration::from_secs(secs)),
            None => Cancellation::new(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            workers: 1,
            on_missing_identity: MissingIdentityPolicy::default(),
            run_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when RUST_LOG is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| ImportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ImportError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.import.workers == 0 {
            return Err(ImportError::Config(
                "import.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
