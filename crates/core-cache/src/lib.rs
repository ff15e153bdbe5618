//! On-disk caching for remote ledger data
//!
//! Two independent mechanisms share a cache root:
//!
//! - **Response Cache**: one JSON file per key, named by the key's SHA-256,
//!   with a per-entry TTL checked on every read
//! - **Cache Manager**: directory-wide size accounting and least-recently-used
//!   eviction down to half the configured budget
//!
//! # Architecture
//!
//! ```text
//! ~/.erst/
//! ├── config.json          ← GlobalCacheConfig (max size, auto clean)
//! └── cache/               ← CacheManager root (LRU sweep)
//!     └── rpc/             ← ResponseCache (TTL entries)
//!         ├── 3f0a…e1.json
//!         └── 9bc2…07.json
//! ```
//!
//! # Example
//!
//! ```no_run
//! use erst_core_cache::{CacheManager, CacheSizeConfig, ResponseCache};
//!
//! let cache = ResponseCache::open_default().unwrap();
//! cache.set("AAAAAgAAAA…", "AAAABgAAAA…").unwrap();
//! assert!(cache.get("AAAAAgAAAA…").unwrap().is_some());
//!
//! let manager = CacheManager::new(cache.dir(), CacheSizeConfig::default());
//! let status = manager.clean_lru().unwrap();
//! println!("freed {} bytes", status.space_freed);
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod response_cache;

// Re-export main types
pub use config::{check_and_cleanup, GlobalCacheConfig};
pub use error::{Error, Error as CacheError, Result};
pub use manager::{CacheManager, CacheSizeConfig, CleanupStatus, FileInfo};
pub use response_cache::{default_cache_root, CachedEntry, ResponseCache, DEFAULT_TTL};
