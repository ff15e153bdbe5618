//! Cache size management with LRU eviction
//!
//! The manager treats a cache root as a plain directory tree. It never looks
//! inside the files, so it works the same for TTL entries, source-map
//! caches or anything else stored under the root.
//!
//! Eviction has a hysteresis band: once the tree grows past
//! `max_size_bytes`, the oldest files are deleted until the total drops to
//! half of the limit, so the next small write does not trigger another sweep.

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Default size budget (1 GiB)
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 1024 * 1024 * 1024;

/// Size budget for a cache root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSizeConfig {
    pub max_size_bytes: u64,
}

impl Default for CacheSizeConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

/// One file found while scanning the cache root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub last_access: SystemTime,
    pub mod_time: SystemTime,
}

/// What a sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupStatus {
    pub files_deleted: usize,
    pub space_freed: u64,
    pub original_size: u64,
    pub final_size: u64,
    pub deleted_files: Vec<PathBuf>,
}

/// Scans and trims a cache directory
#[derive(Debug, Clone)]
pub struct CacheManager {
    cache_dir: PathBuf,
    config: CacheSizeConfig,
}

impl CacheManager {
    pub fn new(cache_dir: impl Into<PathBuf>, config: CacheSizeConfig) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            config,
        }
    }

    pub fn config(&self) -> CacheSizeConfig {
        self.config
    }

    /// Cache root, created if it does not exist yet
    pub fn cache_dir(&self) -> Result<&Path> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| Error::io(&self.cache_dir, e))?;
        Ok(&self.cache_dir)
    }

    /// Total bytes of all regular files under the root
    pub fn cache_size(&self) -> Result<u64> {
        Ok(self.list_cached_files()?.iter().map(|f| f.size).sum())
    }

    /// Every regular file under the root. A missing root is an empty cache.
    pub fn list_cached_files(&self) -> Result<Vec<FileInfo>> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.cache_dir) {
            let entry = match entry {
                Ok(entry) => entry,
                // Files can vanish under a concurrent sweep
                Err(e) if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) => continue,
                Err(e) => return Err(e.into()),
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) => continue,
                Err(e) => return Err(e.into()),
            };
            let mod_time = metadata
                .modified()
                .map_err(|e| Error::io(entry.path(), e))?;
            let last_access = metadata.accessed().unwrap_or(mod_time);

            files.push(FileInfo {
                path: entry.into_path(),
                size: metadata.len(),
                last_access,
                mod_time,
            });
        }
        Ok(files)
    }

    /// Evict least-recently-used files when the root exceeds its budget
    ///
    /// At or under `max_size_bytes` this is a no-op. Over it, files are
    /// deleted oldest-first until the total is at most half the budget.
    pub fn clean_lru(&self) -> Result<CleanupStatus> {
        let files = self.list_cached_files()?;
        let original_size: u64 = files.iter().map(|f| f.size).sum();

        if original_size <= self.config.max_size_bytes {
            tracing::info!(
                current = original_size,
                limit = self.config.max_size_bytes,
                "Cache size within limit"
            );
            return Ok(CleanupStatus {
                original_size,
                final_size: original_size,
                ..Default::default()
            });
        }

        Ok(self.evict_until(files, original_size, self.config.max_size_bytes / 2))
    }

    /// Evict oldest files down to half the budget regardless of the current
    /// size. This backs the explicit `cache clean` command.
    pub fn clean_now(&self) -> Result<CleanupStatus> {
        let files = self.list_cached_files()?;
        let original_size: u64 = files.iter().map(|f| f.size).sum();
        Ok(self.evict_until(files, original_size, self.config.max_size_bytes / 2))
    }

    fn evict_until(&self, mut files: Vec<FileInfo>, original_size: u64, target: u64) -> CleanupStatus {
        sort_files_by_access_time(&mut files);

        let mut status = CleanupStatus {
            original_size,
            ..Default::default()
        };
        let mut current = original_size;

        for file in files {
            if current <= target {
                break;
            }
            if let Err(e) = fs::remove_file(&file.path) {
                tracing::warn!(path = %file.path.display(), error = %e, "Failed to delete cache file");
                continue;
            }

            tracing::debug!(path = %file.path.display(), size = file.size, "Deleted cache file");
            current = current.saturating_sub(file.size);
            status.files_deleted += 1;
            status.space_freed += file.size;
            status.deleted_files.push(file.path);
        }

        status.final_size = current;
        tracing::info!(
            files_deleted = status.files_deleted,
            space_freed = status.space_freed,
            original_size = status.original_size,
            final_size = status.final_size,
            "Cache cleanup completed"
        );
        status
    }
}

/// Sort oldest access first
pub fn sort_files_by_access_time(files: &mut [FileInfo]) {
    files.sort_by(|a, b| a.last_access.cmp(&b.last_access).then_with(|| a.path.cmp(&b.path)));
}
