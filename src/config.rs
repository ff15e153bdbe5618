/*!
 * Configuration for the erst client and CLI
 *
 * Loaded from `~/.erst/erst.toml` when present; every field has a default so
 * a partial or missing file is fine.
 */

use crate::error::{ErstError, Result};
use crate::logging::LogConfig;
use crate::rpc::{ClientBuilder, Network, PayloadLimits, TOKEN_ENV_VAR};
use erst_core_resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network preset
    #[serde(default)]
    pub network: Network,

    /// Ordered general endpoints (empty = network preset)
    #[serde(default)]
    pub rpc_urls: Vec<String>,

    /// Ordered simulation endpoints (empty = network preset)
    #[serde(default)]
    pub soroban_urls: Vec<String>,

    /// Bearer token; `ERST_RPC_TOKEN` is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Use the on-disk response cache
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Per-call deadline in seconds, retries included (None = wait as long as needed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub payload: PayloadSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            rpc_urls: Vec::new(),
            soroban_urls: Vec::new(),
            token: None,
            cache_enabled: true,
            log_level: LogLevel::default(),
            log_file: None,
            call_timeout_secs: None,
            retry: RetrySettings::default(),
            payload: PayloadSettings::default(),
        }
    }
}

/// Retry transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_jitter_fraction")]
    pub jitter_fraction: f64,

    #[serde(default = "default_retry_status_codes")]
    pub retry_status_codes: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter_fraction: default_jitter_fraction(),
            retry_status_codes: default_retry_status_codes(),
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            jitter_fraction: self.jitter_fraction,
            retry_status_codes: self.retry_status_codes.clone(),
        }
    }
}

/// Outgoing request size guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSettings {
    #[serde(default = "default_payload_max")]
    pub max_bytes: u64,

    #[serde(default = "default_payload_warn")]
    pub warn_bytes: u64,
}

impl Default for PayloadSettings {
    fn default() -> Self {
        Self {
            max_bytes: default_payload_max(),
            warn_bytes: default_payload_warn(),
        }
    }
}

impl From<PayloadSettings> for PayloadLimits {
    fn from(settings: PayloadSettings) -> Self {
        PayloadLimits {
            max_bytes: settings.max_bytes,
            warn_bytes: settings.warn_bytes,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_jitter_fraction() -> f64 {
    0.1
}

fn default_retry_status_codes() -> Vec<u16> {
    vec![429, 503, 504]
}

fn default_payload_max() -> u64 {
    crate::rpc::MAX_PAYLOAD_SIZE
}

fn default_payload_warn() -> u64 {
    crate::rpc::WARNING_THRESHOLD
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl AppConfig {
    /// `~/.erst/erst.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".erst").join("erst.toml"))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `path` if given, else the default location if it exists, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path).map_err(|e| match e {
                ErstError::Io(io) => ErstError::Config(format!("cannot read {}: {}", path.display(), io)),
                other => other,
            });
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Token from the config, falling back to `ERST_RPC_TOKEN`
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty()))
    }

    pub fn log_config(&self, verbose: bool) -> LogConfig {
        LogConfig {
            level: self.log_level,
            file: self.log_file.clone(),
            verbose,
        }
    }

    /// Client builder carrying every setting from this config
    pub fn client_builder(&self) -> ClientBuilder {
        let mut builder = ClientBuilder::new()
            .network(self.network)
            .alt_urls(self.rpc_urls.iter().cloned())
            .soroban_urls(self.soroban_urls.iter().cloned())
            .cache_enabled(self.cache_enabled)
            .retry_policy(self.retry.to_policy())
            .payload_limits(self.payload.into());
        if let Some(token) = self.resolved_token() {
            builder = builder.token(token);
        }
        if let Some(secs) = self.call_timeout_secs {
            builder = builder.call_timeout(Duration::from_secs(secs));
        }
        builder
    }
}
