//! # Configuration
//!
//! Settings come from an optional TOML file overlaid with `SHUB__*` environment
//! variables, nested with double underscores (`SHUB__AUDIT__MAX_ENTRIES` maps to
//! `audit.max_entries`). Every field has a default, so an empty source is valid.

use crate::audit::{DEFAULT_MAX_ENTRIES, DEFAULT_QUEUE_CAPACITY};
use crate::lifecycle::DEFAULT_ACK_TIMEOUT;
use config::{Config, Environment, File};
use serde::Deserialize;
use shub_vault::{DEFAULT_KEY_ACCOUNT, DEFAULT_KEY_SERVICE};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "sitehub";
const ENV_PREFIX: &str = "SHUB";

#[shub_derive::shub_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub storage: StorageSettings,
    pub keystore: KeystoreSettings,
    pub audit: AuditSettings,
    pub lifecycle: LifecycleSettings,
    pub csp: CspSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub dir: PathBuf,
    pub file_name: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { dir: PathBuf::from("data"), file_name: "config.json".to_owned() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeystoreSettings {
    /// Directory of the file keystore.
    pub dir: PathBuf,
    pub service: String,
    pub account: String,
}

impl Default for KeystoreSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/keys"),
            service: DEFAULT_KEY_SERVICE.to_owned(),
            account: DEFAULT_KEY_ACCOUNT.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub max_entries: usize,
    pub queue_capacity: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self { max_entries: DEFAULT_MAX_ENTRIES, queue_capacity: DEFAULT_QUEUE_CAPACITY }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    pub ack_timeout_ms: u64,
}

impl LifecycleSettings {
    #[must_use]
    pub const fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let ack_timeout_ms = DEFAULT_ACK_TIMEOUT.as_millis() as u64;
        Self { ack_timeout_ms }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CspSettings {
    pub development: bool,
    /// Extra `'sha256-…'` sources allowed in `style-src`.
    pub style_hashes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Rolling log files go here when set.
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub max_files: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_owned(), dir: None, json: false, max_files: 7 }
    }
}

/// Loads [`BoundaryConfig`] from `path`, or from an optional `sitehub.toml` in the
/// working directory, then applies environment overrides.
///
/// An explicit `path` must exist.
///
/// # Errors
/// [`ConfigError::Config`] when the file is unreadable or a value has the wrong shape.
pub fn load_config(path: Option<&Path>) -> Result<BoundaryConfig, ConfigError> {
    let file = match path {
        Some(p) => {
            info!("Loading config from {}", p.display());
            File::from(p).required(true)
        },
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__"))
        .build()
        .context("Failed to build config")?
        .try_deserialize::<BoundaryConfig>()
        .context("Failed to deserialize config")
}
