//! Application-wide constants and default policy values
//!
//! Every threshold here is only a default: the `policy` section of the
//! configuration file can override each one.

/// Upstream used when neither the config file nor the environment names one
pub const DEFAULT_API_DOMAIN: &str = "https://v3.football.api-sports.io";

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Maximum number of connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 100;

/// Bumped whenever the persisted record format changes incompatibly.
/// A mismatch wipes every cache key from the durable store on open.
pub const CACHE_VERSION: &str = "3";

/// Lifecycle classification thresholds in seconds
pub mod lifecycle {
    /// Not-started fixtures whose kickoff passed longer ago than this are
    /// treated as live (upstream status updates lag kickoff)
    pub const SUSPECT_LIVE_AFTER_SECONDS: u64 = 2 * 3600;

    /// Assumed duration from kickoff to full time, used to estimate the end
    pub const MATCH_DURATION_SECONDS: u64 = 90 * 60;

    /// Concluded fixtures that ended within this window may still get score amendments
    pub const RECENTLY_ENDED_WINDOW_SECONDS: u64 = 2 * 3600;

    /// Boundary between the regular and the ancient ended tier
    pub const OLD_ENDED_WINDOW_SECONDS: u64 = 24 * 3600;

    /// Kickoffs within this distance of now count as near
    pub const NEAR_KICKOFF_WINDOW_SECONDS: u64 = 2 * 3600;
}

/// Cache TTL (Time To Live) values in seconds
pub mod cache_ttl {
    /// TTL for fixtures that ended more than the recent window ago, up to a day
    pub const OLD_ENDED_SECONDS: u64 = 6 * 3600;

    /// TTL for fixtures that ended more than a day ago
    pub const ANCIENT_ENDED_SECONDS: u64 = 30 * 24 * 3600;

    /// TTL for not-started fixtures kicking off soon
    pub const UPCOMING_NEAR_SECONDS: u64 = 2 * 60;

    /// TTL for not-started fixtures far from kickoff
    pub const UPCOMING_FAR_SECONDS: u64 = 24 * 3600;

    /// TTL for date buckets strictly before today
    pub const PAST_BUCKET_SECONDS: u64 = 7 * 24 * 3600;

    /// TTL for today's bucket, which mixes every lifecycle class
    pub const TODAY_BUCKET_SECONDS: u64 = 30 * 60;

    /// TTL for date buckets strictly after today
    pub const FUTURE_BUCKET_SECONDS: u64 = 24 * 3600;
}

/// Durable tier retention
pub mod persistence {
    /// Key prefix for persisted date buckets
    pub const RECORD_PREFIX: &str = "fixtures-persist:";

    /// Key holding the cache version marker
    pub const VERSION_KEY: &str = "fixture-cache:version";

    /// Dates at most this many days old keep their record for the short retention
    pub const RECENT_RECORD_DAYS: i64 = 7;

    /// Retention for records of recent dates
    pub const RECENT_RETENTION_SECONDS: u64 = 7 * 24 * 3600;

    /// Retention for records of older dates
    pub const OLD_RETENTION_SECONDS: u64 = 30 * 24 * 3600;

    /// Non-cache keys that survive an emergency cleanup
    pub const DEFAULT_PRESERVED_KEYS: &[&str] = &[
        VERSION_KEY,
        "auth-session",
        "user-preferences",
        "starred-fixtures",
    ];
}

/// In-memory store limits and maintenance cadence
pub mod store {
    /// Default LRU capacity of the entry store
    pub const DEFAULT_CAPACITY: usize = 500;

    /// Transition records idle for longer than this are pruned
    pub const TRANSITION_RETENTION_SECONDS: u64 = 3600;

    /// Interval of the background maintenance task
    pub const MAINTENANCE_INTERVAL_SECONDS: u64 = 5 * 60;
}

/// Environment variable names
pub mod env_vars {
    /// Environment variable for API domain override
    pub const API_DOMAIN: &str = "FIXTURE_API_DOMAIN";

    /// Environment variable for upstream API key
    pub const API_KEY: &str = "FIXTURE_API_KEY";

    /// Environment variable for log file path override
    pub const LOG_FILE: &str = "FIXTURE_LOG_FILE";

    /// Environment variable for HTTP timeout override in seconds
    pub const HTTP_TIMEOUT: &str = "FIXTURE_HTTP_TIMEOUT";

    /// Environment variable for cache size override
    pub const CACHE_SIZE: &str = "FIXTURE_CACHE_SIZE";
}

/// Retry configuration for the upstream source
pub mod retry {
    /// Maximum number of retry attempts for API calls
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 250;

    /// Jitter range applied to each backoff step (fraction of the step)
    pub const JITTER_FRACTION: f64 = 0.2;
}
