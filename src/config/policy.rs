use serde::{Deserialize, Serialize};

use crate::constants::{cache_ttl, lifecycle, persistence, store};

/// `[cache]` section: store sizing and the durable tier.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of in-memory entries before LRU eviction
    pub capacity: usize,
    /// Whether concluded past-date buckets are written to disk
    pub persistent: bool,
    /// Location of the durable store. Defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_path: Option<String>,
    /// Byte limit of the durable store, counting keys and values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<usize>,
    /// Non-cache keys kept by an emergency cleanup
    pub preserved_keys: Vec<String>,
    pub maintenance_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: store::DEFAULT_CAPACITY,
            persistent: true,
            persistent_path: None,
            quota_bytes: None,
            preserved_keys: persistence::DEFAULT_PRESERVED_KEYS
                .iter()
                .map(|key| key.to_string())
                .collect(),
            maintenance_interval_seconds: store::MAINTENANCE_INTERVAL_SECONDS,
        }
    }
}

/// `[policy]` section: every lifecycle threshold and TTL, in seconds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    pub suspect_live_after_seconds: u64,
    pub match_duration_seconds: u64,
    pub recently_ended_window_seconds: u64,
    pub old_ended_window_seconds: u64,
    pub near_kickoff_window_seconds: u64,

    pub old_ended_ttl_seconds: u64,
    pub ancient_ended_ttl_seconds: u64,
    pub upcoming_near_ttl_seconds: u64,
    pub upcoming_far_ttl_seconds: u64,

    pub past_bucket_ttl_seconds: u64,
    pub today_bucket_ttl_seconds: u64,
    pub future_bucket_ttl_seconds: u64,

    /// Dates at most this many days old use the recent record retention
    pub recent_record_days: u32,
    pub recent_record_retention_seconds: u64,
    pub old_record_retention_seconds: u64,

    pub transition_retention_seconds: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            suspect_live_after_seconds: lifecycle::SUSPECT_LIVE_AFTER_SECONDS,
            match_duration_seconds: lifecycle::MATCH_DURATION_SECONDS,
            recently_ended_window_seconds: lifecycle::RECENTLY_ENDED_WINDOW_SECONDS,
            old_ended_window_seconds: lifecycle::OLD_ENDED_WINDOW_SECONDS,
            near_kickoff_window_seconds: lifecycle::NEAR_KICKOFF_WINDOW_SECONDS,
            old_ended_ttl_seconds: cache_ttl::OLD_ENDED_SECONDS,
            ancient_ended_ttl_seconds: cache_ttl::ANCIENT_ENDED_SECONDS,
            upcoming_near_ttl_seconds: cache_ttl::UPCOMING_NEAR_SECONDS,
            upcoming_far_ttl_seconds: cache_ttl::UPCOMING_FAR_SECONDS,
            past_bucket_ttl_seconds: cache_ttl::PAST_BUCKET_SECONDS,
            today_bucket_ttl_seconds: cache_ttl::TODAY_BUCKET_SECONDS,
            future_bucket_ttl_seconds: cache_ttl::FUTURE_BUCKET_SECONDS,
            recent_record_days: persistence::RECENT_RECORD_DAYS as u32,
            recent_record_retention_seconds: persistence::RECENT_RETENTION_SECONDS,
            old_record_retention_seconds: persistence::OLD_RETENTION_SECONDS,
            transition_retention_seconds: store::TRANSITION_RETENTION_SECONDS,
        }
    }
}
