/*!
 * `erst cache` - inspect, sweep and configure the on-disk cache
 */

use crate::cli_style::{cleanup_summary_table, format_bytes, print_info, print_success, section_header, stats_table};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dialoguer::{theme::ColorfulTheme, Confirm};
use erst_core_cache::{check_and_cleanup, CacheManager, CacheSizeConfig, CleanupStatus, GlobalCacheConfig};
use std::path::Path;
use std::time::SystemTime;

fn manager(root: &Path, config: &GlobalCacheConfig) -> CacheManager {
    CacheManager::new(
        root,
        CacheSizeConfig {
            max_size_bytes: config.max_size_bytes,
        },
    )
}

/// Startup hook: sweep the cache when it has outgrown its threshold
pub fn auto_cleanup(root: &Path, config: &GlobalCacheConfig) -> Option<CleanupStatus> {
    match check_and_cleanup(root, config) {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(error = %e, "Automatic cache cleanup failed");
            None
        }
    }
}

/// Print size, file count and limits
pub fn status(root: &Path, config: &GlobalCacheConfig) -> Result<()> {
    let manager = manager(root, config);
    let files = manager
        .list_cached_files()
        .with_context(|| format!("Failed to scan cache at {}", root.display()))?;
    let size: u64 = files.iter().map(|f| f.size).sum();

    let mut rows = vec![
        ("Location", root.display().to_string()),
        ("Files", files.len().to_string()),
        ("Size", format_bytes(size)),
        ("Limit", format_bytes(config.max_size_bytes)),
        ("Auto clean", config.auto_clean.to_string()),
        ("Auto clean threshold", format_bytes(config.auto_clean_threshold)),
    ];
    if let (Some(oldest), Some(newest)) = (
        files.iter().map(|f| f.last_access).min(),
        files.iter().map(|f| f.last_access).max(),
    ) {
        rows.push(("Oldest access", format_time(oldest)));
        rows.push(("Newest access", format_time(newest)));
    }

    section_header("Cache Status");
    println!("{}", stats_table(&rows));
    Ok(())
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Evict least-recently-used files down to half the limit
///
/// Asks for confirmation unless `force` is set.
pub fn clean(root: &Path, config: &GlobalCacheConfig, force: bool) -> Result<Option<CleanupStatus>> {
    let manager = manager(root, config);
    let size = manager.cache_size().context("Failed to measure cache size")?;
    let target = config.max_size_bytes / 2;

    if size <= target {
        print_info(&format!(
            "Cache is {} which is already within the {} cleanup target.",
            format_bytes(size),
            format_bytes(target)
        ));
        return Ok(None);
    }

    if !force {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete least-recently-used cache files to shrink {} down to {}?",
                format_bytes(size),
                format_bytes(target)
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            print_info("Cache unchanged.");
            return Ok(None);
        }
    }

    let status = manager.clean_now().context("Cache cleanup failed")?;
    section_header("Cache Cleanup");
    println!("{}", cleanup_summary_table(&status));
    print_success(&format!("Freed {}", format_bytes(status.space_freed)));
    Ok(Some(status))
}

/// Update the global cache configuration and save it
pub fn configure(
    config_path: &Path,
    mut config: GlobalCacheConfig,
    max_size: Option<u64>,
    auto_clean: Option<bool>,
) -> Result<GlobalCacheConfig> {
    if let Some(max_size) = max_size {
        config.max_size_bytes = max_size;
        config.auto_clean_threshold = max_size;
    }
    if let Some(auto_clean) = auto_clean {
        config.auto_clean = auto_clean;
    }

    if max_size.is_some() || auto_clean.is_some() {
        config
            .save_to(config_path)
            .with_context(|| format!("Failed to save {}", config_path.display()))?;
        print_success(&format!("Saved {}", config_path.display()));
    }

    println!(
        "{}",
        stats_table(&[
            ("Max size", format_bytes(config.max_size_bytes)),
            ("Auto clean", config.auto_clean.to_string()),
            ("Auto clean threshold", format_bytes(config.auto_clean_threshold)),
        ])
    );
    Ok(config)
}
