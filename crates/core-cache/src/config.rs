//! Global cache configuration (`~/.erst/config.json`)
//!
//! Read on every process start to decide whether an automatic LRU sweep runs
//! before normal operation. A missing or unreadable file is never fatal:
//! defaults apply and the reason is logged.

use crate::error::{Error, Result};
use crate::manager::{CacheManager, CacheSizeConfig, CleanupStatus, DEFAULT_MAX_SIZE_BYTES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCacheConfig {
    /// Size budget used by the LRU sweep
    #[serde(default = "default_max_size")]
    pub max_size_bytes: u64,

    /// Run the sweep automatically on startup
    #[serde(default = "default_true")]
    pub auto_clean: bool,

    /// Cache size that triggers the automatic sweep
    #[serde(default = "default_max_size")]
    pub auto_clean_threshold: u64,
}

impl Default for GlobalCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            auto_clean: true,
            auto_clean_threshold: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

fn default_max_size() -> u64 {
    DEFAULT_MAX_SIZE_BYTES
}

fn default_true() -> bool {
    true
}

/// `~/.erst/config.json`
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(Error::NoHomeDir)?;
    Ok(home.join(".erst").join("config.json"))
}

impl GlobalCacheConfig {
    /// Load from the per-user location, falling back to defaults
    pub fn load() -> Self {
        match config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to get config path, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file does not exist, using defaults");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                Self::default()
            }
        }
    }

    /// Save to the per-user location
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data).map_err(|e| Error::io(path, e))?;
        tracing::info!(path = %path.display(), "Config saved successfully");
        Ok(())
    }
}

/// Startup hook: sweep `cache_dir` when it has grown past the threshold
///
/// Returns the sweep result when one ran. Failing to measure the cache is
/// logged and treated as "nothing to do".
pub fn check_and_cleanup(cache_dir: &Path, config: &GlobalCacheConfig) -> Result<Option<CleanupStatus>> {
    if !config.auto_clean {
        return Ok(None);
    }

    let manager = CacheManager::new(
        cache_dir,
        CacheSizeConfig {
            max_size_bytes: config.max_size_bytes,
        },
    );

    let size = match manager.cache_size() {
        Ok(size) => size,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to check cache size");
            return Ok(None);
        }
    };

    if size <= config.auto_clean_threshold {
        return Ok(None);
    }

    tracing::info!(
        current_size = size,
        threshold = config.auto_clean_threshold,
        "Cache size exceeds threshold, performing automatic cleanup"
    );
    let status = manager.clean_lru()?;
    tracing::info!(
        files_deleted = status.files_deleted,
        space_freed = status.space_freed,
        "Automatic cache cleanup completed"
    );
    Ok(Some(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = GlobalCacheConfig::default();
        assert_eq!(config.max_size_bytes, 1024 * 1024 * 1024);
        assert!(config.auto_clean);
        assert_eq!(config.auto_clean_threshold, 1024 * 1024 * 1024);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = GlobalCacheConfig::load_from(&dir.path().join("config.json"));
        assert_eq!(config, GlobalCacheConfig::default());
    }

    #[test]
    fn test_corrupt_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{{{").unwrap();
        assert_eq!(GlobalCacheConfig::load_from(&path), GlobalCacheConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = GlobalCacheConfig {
            max_size_bytes: 4096,
            auto_clean: false,
            auto_clean_threshold: 2048,
        };
        config.save_to(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["max_size_bytes"], 4096);
        assert_eq!(raw["auto_clean"], false);
        assert_eq!(raw["auto_clean_threshold"], 2048);

        assert_eq!(GlobalCacheConfig::load_from(&path), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"auto_clean": false}"#).unwrap();

        let config = GlobalCacheConfig::load_from(&path);
        assert!(!config.auto_clean);
        assert_eq!(config.max_size_bytes, DEFAULT_MAX_SIZE_BYTES);
    }

    #[test]
    fn test_auto_clean_disabled_skips_sweep() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big"), vec![0u8; 1000]).unwrap();
        let config = GlobalCacheConfig {
            max_size_bytes: 10,
            auto_clean: false,
            auto_clean_threshold: 10,
        };
        assert!(check_and_cleanup(dir.path(), &config).unwrap().is_none());
        assert!(dir.path().join("big").exists());
    }

    #[test]
    fn test_below_threshold_skips_sweep() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("small"), vec![0u8; 10]).unwrap();
        let config = GlobalCacheConfig {
            max_size_bytes: 1000,
            auto_clean: true,
            auto_clean_threshold: 1000,
        };
        assert!(check_and_cleanup(dir.path(), &config).unwrap().is_none());
    }

    #[test]
    fn test_above_threshold_sweeps() {
        let dir = TempDir::new().unwrap();
        for i in 0..4 {
            fs::write(dir.path().join(format!("f{}", i)), vec![0u8; 100]).unwrap();
        }
        let config = GlobalCacheConfig {
            max_size_bytes: 200,
            auto_clean: true,
            auto_clean_threshold: 300,
        };
        let status = check_and_cleanup(dir.path(), &config).unwrap().unwrap();
        assert_eq!(status.original_size, 400);
        assert!(status.final_size <= 100);
        assert_eq!(status.files_deleted, 3);
    }
}
