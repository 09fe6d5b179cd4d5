//! Composer configuration types.

use serde::{Deserialize, Serialize};

/// Top-level composer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Imagery backend connection settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Mosaic grouping parameters.
    #[serde(default)]
    pub grouping: GroupingConfig,

    /// Artifact cache policy.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Imagery backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the imagery service (e.g., "http://localhost:8000").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout applied to every catalog and tile call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Cloud cover ceiling used when the caller does not pass one.
    #[serde(default = "default_cloud_filter")]
    pub cloud_filter: u8,
}

/// Mosaic grouping parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Max calendar-month gap between consecutive dates of a group.
    #[serde(default = "default_gap_tolerance_months")]
    pub gap_tolerance_months: u32,

    /// Groups with fewer dates are discarded.
    #[serde(default = "default_min_group_size")]
    pub min_group_size: u32,

    /// A group is closed once it holds this many dates.
    #[serde(default = "default_max_group_size")]
    pub max_group_size: u32,
}

/// Artifact cache policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix mixed into every request fingerprint.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Lifetime of a stored result set.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,

    /// Capacity of the backing store, in entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Interval of the background expiry sweep.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "http://localhost:8000".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "mosaic-composer/0.1".into()
}
fn default_cloud_filter() -> u8 {
    20
}

fn default_gap_tolerance_months() -> u32 {
    2
}
fn default_min_group_size() -> u32 {
    10
}
fn default_max_group_size() -> u32 {
    15
}

fn default_namespace() -> String {
    "mosaic".into()
}
fn default_ttl_minutes() -> u64 {
    60
}
fn default_max_entries() -> usize {
    256
}
fn default_sweep_interval() -> u64 {
    300
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            cloud_filter: default_cloud_filter(),
        }
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            gap_tolerance_months: default_gap_tolerance_months(),
            min_group_size: default_min_group_size(),
            max_group_size: default_max_group_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            ttl_minutes: default_ttl_minutes(),
            max_entries: default_max_entries(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let parsed: ComposerConfig = serde_json::from_str(
            r#"{"grouping": {"min_group_size": 4}, "cache": {"ttl_minutes": 120}}"#,
        )
        .expect("config should deserialize");

        assert_eq!(parsed.grouping.min_group_size, 4);
        assert_eq!(parsed.grouping.max_group_size, 15);
        assert_eq!(parsed.grouping.gap_tolerance_months, 2);
        assert_eq!(parsed.cache.ttl_minutes, 120);
        assert_eq!(parsed.cache.namespace, "mosaic");
        assert_eq!(parsed.backend.base_url, "http://localhost:8000");
        assert_eq!(parsed.backend.cloud_filter, 20);
    }
}
