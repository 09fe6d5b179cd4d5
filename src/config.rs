//! Configuration loader: merges env vars, .env file, and config.toml.

use common::{ComposerConfig, Error};
use std::path::Path;

/// Longest cache lifetime accepted from configuration (one day).
const MAX_TTL_MINUTES: u64 = 24 * 60;

fn parse_positive_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    match raw.trim().parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(Error::Config(format!("{env_name} must be an integer > 0"))),
    }
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    match raw.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(Error::Config(format!("{env_name} must be an integer > 0"))),
    }
}

pub fn validate_config(config: &ComposerConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.backend.base_url.trim().is_empty() {
        issues.push("backend.base_url must not be empty".into());
    }
    if config.backend.timeout_secs == 0 {
        issues.push("backend.timeout_secs must be > 0".into());
    }
    if config.backend.cloud_filter > 100 {
        issues.push("backend.cloud_filter must be in [0,100]".into());
    }

    if config.grouping.gap_tolerance_months == 0 {
        issues.push("grouping.gap_tolerance_months must be > 0".into());
    }
    if config.grouping.min_group_size == 0 {
        issues.push("grouping.min_group_size must be > 0".into());
    }
    if config.grouping.max_group_size == 0 {
        issues.push("grouping.max_group_size must be > 0".into());
    }
    if config.grouping.min_group_size > config.grouping.max_group_size {
        issues.push("grouping.min_group_size must be <= grouping.max_group_size".into());
    }

    if config.cache.namespace.trim().is_empty() {
        issues.push("cache.namespace must not be empty".into());
    }
    if config.cache.ttl_minutes == 0 || config.cache.ttl_minutes > MAX_TTL_MINUTES {
        issues.push(format!("cache.ttl_minutes must be in [1,{MAX_TTL_MINUTES}]"));
    }
    if config.cache.max_entries == 0 {
        issues.push("cache.max_entries must be > 0".into());
    }
    if config.cache.sweep_interval_secs == 0 {
        issues.push("cache.sweep_interval_secs must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

fn apply_env_overrides(config: &mut ComposerConfig) -> Result<(), Error> {
    if let Ok(url) = std::env::var("MOSAIC_BACKEND_URL") {
        config.backend.base_url = url.trim().to_string();
    }
    if let Ok(raw) = std::env::var("MOSAIC_TIMEOUT_SECS") {
        config.backend.timeout_secs = parse_positive_u64(&raw, "MOSAIC_TIMEOUT_SECS")?;
    }
    if let Ok(raw) = std::env::var("MOSAIC_GAP_TOLERANCE_MONTHS") {
        config.grouping.gap_tolerance_months =
            parse_positive_u32(&raw, "MOSAIC_GAP_TOLERANCE_MONTHS")?;
    }
    if let Ok(raw) = std::env::var("MOSAIC_MIN_GROUP_SIZE") {
        config.grouping.min_group_size = parse_positive_u32(&raw, "MOSAIC_MIN_GROUP_SIZE")?;
    }
    if let Ok(raw) = std::env::var("MOSAIC_MAX_GROUP_SIZE") {
        config.grouping.max_group_size = parse_positive_u32(&raw, "MOSAIC_MAX_GROUP_SIZE")?;
    }
    if let Ok(raw) = std::env::var("MOSAIC_CACHE_TTL_MINUTES") {
        config.cache.ttl_minutes = parse_positive_u64(&raw, "MOSAIC_CACHE_TTL_MINUTES")?;
    }
    if let Ok(raw) = std::env::var("MOSAIC_CACHE_MAX_ENTRIES") {
        config.cache.max_entries =
            parse_positive_u64(&raw, "MOSAIC_CACHE_MAX_ENTRIES")? as usize;
    }
    Ok(())
}

/// Load composer configuration from environment and an optional config file.
pub fn load_config(path: &Path) -> Result<ComposerConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults, replaced by the config file if it exists.
    let mut config = ComposerConfig::default();
    if path.exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    }

    // 3. Environment variables take priority.
    apply_env_overrides(&mut config)?;

    validate_config(&config)?;

    Ok(config)
}
