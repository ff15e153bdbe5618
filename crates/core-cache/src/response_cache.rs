//! TTL-bounded response cache
//!
//! Each entry lives in its own JSON file named after the SHA-256 digest of
//! the cache key, so arbitrary keys map to fixed, filesystem-safe names:
//!
//! ```text
//! ~/.erst/cache/rpc/
//!   3f0a…e1.json   {"key":"AAAA…","value":"…","created_at":"…","expires_at":"…","ttl":86400}
//! ```
//!
//! Expired entries are logical tombstones: `get` treats them as missing and
//! deletes the file on the way out. `cleanup` is a coarser janitor that only
//! looks at file modification times.
//!
//! There is no cross-process locking. Concurrent writers to the same key
//! race and the last rename wins.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// TTL applied by [`ResponseCache::set`]
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const ENTRY_EXTENSION: &str = "json";

/// One cached key/value pair as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// TTL in whole seconds
    pub ttl: u64,
}

impl CachedEntry {
    /// Build an entry created at `now` that expires `ttl` later
    pub fn new(key: &str, value: &str, ttl: Duration, now: DateTime<Utc>) -> Result<Self> {
        let offset = chrono::Duration::from_std(ttl).map_err(|_| Error::InvalidTtl(ttl))?;
        let expires_at = now.checked_add_signed(offset).ok_or(Error::InvalidTtl(ttl))?;
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
            created_at: now,
            expires_at,
            ttl: ttl.as_secs(),
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// SHA-256 hex digest of a cache key
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// File-per-entry cache with per-entry expiry
#[derive(Debug)]
pub struct ResponseCache {
    dir: PathBuf,
    default_ttl: Duration,
    write_seq: AtomicU64,
}

impl ResponseCache {
    /// Open (and create if needed) a cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        create_private_dir(&dir)?;
        Ok(Self {
            dir,
            default_ttl: DEFAULT_TTL,
            write_seq: AtomicU64::new(0),
        })
    }

    /// Open the per-user cache at `~/.erst/cache/rpc`
    pub fn open_default() -> Result<Self> {
        Self::new(default_cache_root()?.join("rpc"))
    }

    /// Override the TTL used by [`set`](Self::set)
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Path of the file backing `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", hash_key(key), ENTRY_EXTENSION))
    }

    /// Look up `key`
    ///
    /// Missing, corrupt and expired entries all read as `None`. Corrupt files
    /// are left in place; expired ones are removed.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };

        let entry: CachedEntry = match serde_json::from_slice(&data) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt cache entry");
                return Ok(None);
            }
        };

        if entry.key != key {
            tracing::warn!(path = %path.display(), "Cache entry key does not match its file name");
            return Ok(None);
        }

        if entry.is_expired_at(Utc::now()) {
            tracing::debug!(path = %path.display(), expired_at = %entry.expires_at, "Cache entry expired");
            remove_if_present(&path)?;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    /// Store `value` under `key` with the default TTL
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    /// Store `value` under `key`, expiring after `ttl`
    pub fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = CachedEntry::new(key, value, ttl, Utc::now())?;
        let data = serde_json::to_vec(&entry)?;

        let path = self.entry_path(key);
        let tmp = path.with_extension(format!(
            "tmp.{}.{}",
            std::process::id(),
            self.write_seq.fetch_add(1, Ordering::Relaxed)
        ));

        write_private_file(&tmp, &data)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(Error::io(path, e));
        }
        Ok(())
    }

    /// Drop the entry for `key`; absent entries are fine
    pub fn invalidate(&self, key: &str) -> Result<()> {
        remove_if_present(&self.entry_path(key))
    }

    /// Delete every file in the cache directory last modified more than
    /// `max_age` ago. Returns the number of files removed.
    pub fn cleanup(&self, max_age: Duration) -> Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::io(&self.dir, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.dir, e))?;
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };
            let modified = metadata.modified().map_err(|e| Error::io(&path, e))?;
            if modified < cutoff {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale cache file")
                    }
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, max_age_secs = max_age.as_secs(), "Cache cleanup removed stale entries");
        }
        Ok(removed)
    }
}

/// Root of the per-user cache: `~/.erst/cache`
pub fn default_cache_root() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(Error::NoHomeDir)?;
    Ok(home.join(".erst").join("cache"))
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(|e| Error::io(dir, e))?;
    }
    Ok(())
}

fn write_private_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| Error::io(path, e))?;
    file.write_all(data).map_err(|e| Error::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache() -> (TempDir, ResponseCache) {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path().join("rpc")).unwrap();
        (dir, cache)
    }

    #[test]
    fn test_set_then_get() {
        let (_dir, cache) = cache();
        cache.set("AAAA", "xdr-value").unwrap();
        assert_eq!(cache.get("AAAA").unwrap(), Some("xdr-value".to_string()));
    }

    #[test]
    fn test_missing_key_is_miss() {
        let (_dir, cache) = cache();
        assert_eq!(cache.get("nothing-here").unwrap(), None);
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let (_dir, cache) = cache();
        cache
            .set_with_ttl("AAAA", "short-lived", Duration::from_millis(20))
            .unwrap();
        let path = cache.entry_path("AAAA");
        assert!(path.exists());

        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(cache.get("AAAA").unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_entry_is_miss_and_kept() {
        let (_dir, cache) = cache();
        let path = cache.entry_path("AAAA");
        fs::write(&path, b"{not json").unwrap();

        assert_eq!(cache.get("AAAA").unwrap(), None);
        assert!(path.exists());
    }

    #[test]
    fn test_entry_file_layout() {
        let (_dir, cache) = cache();
        cache.set("some/key with spaces+=", "v").unwrap();

        let path = cache.entry_path("some/key with spaces+=");
        let name = path.file_stem().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));

        let entry: CachedEntry = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(entry.key, "some/key with spaces+=");
        assert_eq!(entry.ttl, DEFAULT_TTL.as_secs());
        assert_eq!(
            entry.expires_at - entry.created_at,
            chrono::Duration::seconds(DEFAULT_TTL.as_secs() as i64)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_entry_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, cache) = cache();
        cache.set("AAAA", "v").unwrap();
        let mode = fs::metadata(cache.entry_path("AAAA")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_invalidate_tolerates_absent() {
        let (_dir, cache) = cache();
        cache.set("AAAA", "v").unwrap();
        cache.invalidate("AAAA").unwrap();
        assert_eq!(cache.get("AAAA").unwrap(), None);
        cache.invalidate("AAAA").unwrap();
    }

    #[test]
    fn test_overwrite_keeps_last_value() {
        let (_dir, cache) = cache();
        cache.set("AAAA", "first").unwrap();
        cache.set("AAAA", "second").unwrap();
        assert_eq!(cache.get("AAAA").unwrap(), Some("second".to_string()));
        assert_eq!(fs::read_dir(cache.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_hash_key_is_stable() {
        assert_eq!(hash_key("abc"), hash_key("abc"));
        assert_ne!(hash_key("abc"), hash_key("abd"));
        assert_eq!(
            hash_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
