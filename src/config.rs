#![forbid(unsafe_code)]

//! Emulator configuration: defaults, TOML file and environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::ChainMode;

/// Key the snapshot is stored under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "eduflow_demo_db";

/// Environment variable naming the live backend URL.
pub const ENV_BACKEND_URL: &str = "EDUFLOW_BACKEND_URL";
/// Environment variable naming the snapshot directory.
pub const ENV_STORAGE_DIR: &str = "EDUFLOW_STORAGE_DIR";
/// Environment variable overriding the snapshot key.
pub const ENV_STORAGE_KEY: &str = "EDUFLOW_STORAGE_KEY";
/// Environment variable selecting `compat` or `faithful` chain semantics.
pub const ENV_CHAIN_MODE: &str = "EDUFLOW_CHAIN_MODE";

/// Where snapshots are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageTarget {
    /// Process-local memory, optionally capped to emulate a storage quota.
    Memory {
        /// Maximum bytes a single snapshot may occupy.
        capacity: Option<usize>,
    },
    /// One file per key inside this directory.
    Directory(PathBuf),
}

/// Which backend the application should talk to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendMode {
    /// No usable backend URL; use the in-process emulator.
    Local,
    /// A live backend is configured at this URL.
    Remote(String),
}

/// Options used when opening a [`crate::LocalClient`].
#[derive(Clone, Debug)]
pub struct EmulatorOptions {
    /// Live backend URL, if any.
    pub backend_url: Option<String>,
    /// Snapshot medium.
    pub storage: StorageTarget,
    /// Key the snapshot is stored under.
    pub storage_key: String,
    /// Semantics for `not` / `order`.
    pub chain_mode: ChainMode,
}

impl Default for EmulatorOptions {
    fn default() -> Self {
        Self {
            backend_url: None,
            storage: StorageTarget::Memory { capacity: None },
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            chain_mode: ChainMode::Compat,
        }
    }
}

impl EmulatorOptions {
    /// Loads options from `explicit` or the default config path, then applies
    /// environment overrides. A missing file yields the defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let raw = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        let mut options = Self::from_raw(raw)?;
        options.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(options)
    }

    /// Parses options from TOML text without touching the environment.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_raw(raw)
    }

    /// Applies overrides from a variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = Some(url);
        }
        if let Some(dir) = lookup(ENV_STORAGE_DIR) {
            self.storage = StorageTarget::Directory(PathBuf::from(dir));
        }
        if let Some(key) = lookup(ENV_STORAGE_KEY) {
            self.storage_key = key;
        }
        if let Some(mode) = lookup(ENV_CHAIN_MODE) {
            self.chain_mode = parse_chain_mode(&mode)?;
        }
        Ok(())
    }

    /// Resolves the backend mode from the configured URL.
    pub fn backend_mode(&self) -> BackendMode {
        match self.backend_url.as_deref() {
            Some(url) if is_url_valid(url) => BackendMode::Remote(url.to_string()),
            _ => BackendMode::Local,
        }
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let storage = match (raw.storage.dir, raw.storage.memory_capacity) {
            (Some(dir), _) => StorageTarget::Directory(dir),
            (None, Some(capacity)) => StorageTarget::Memory {
                capacity: Some(capacity),
            },
            (None, None) => defaults.storage,
        };
        let chain_mode = match raw.query.chain_mode {
            Some(mode) => parse_chain_mode(&mode)?,
            None => defaults.chain_mode,
        };
        Ok(Self {
            backend_url: raw.backend.url.filter(|url| !url.is_empty()),
            storage,
            storage_key: raw.storage.key.unwrap_or(defaults.storage_key),
            chain_mode,
        })
    }
}

/// A backend URL is usable only when it carries an http(s) scheme.
pub fn is_url_valid(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("eduflow").join("local.toml"))
}

fn parse_chain_mode(value: &str) -> Result<ChainMode, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "compat" => Ok(ChainMode::Compat),
        "faithful" => Ok(ChainMode::Faithful),
        _ => Err(ConfigError::InvalidChainMode {
            value: value.to_string(),
        }),
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    backend: BackendSection,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    query: QuerySection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct BackendSection {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct StorageSection {
    dir: Option<PathBuf>,
    key: Option<String>,
    memory_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct QuerySection {
    chain_mode: Option<String>,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// `chain_mode` was neither `compat` nor `faithful`.
    #[error("chain mode '{value}' must be 'compat' or 'faithful'")]
    InvalidChainMode {
        /// Rejected value.
        value: String,
    },
}
