//! Lifecycle-aware fixture cache for live sports dashboards
//!
//! Fixtures are cached according to where they are in their lifecycle: live
//! and just-finished fixtures are never cached, upcoming fixtures expire as
//! kickoff nears, and past dates whose fixtures have all concluded are kept in
//! a durable store across restarts.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fixture_cache::config::Config;
//! use fixture_cache::data_fetcher::{FixtureCache, FixtureService, HttpFixtureSource};
//! use fixture_cache::error::AppError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let config = Config::load().await?;
//!     let cache = Arc::new(FixtureCache::from_config(&config));
//!     let source = Arc::new(HttpFixtureSource::from_config(&config)?);
//!     let service = FixtureService::new(Arc::clone(&cache), source);
//!
//!     let today = cache.time_context().today();
//!     let shown = service.fixtures_for_date(today).await?;
//!     println!("{} fixtures, cached: {}", shown.fixtures.len(), shown.from_cache);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod data_fetcher;
pub mod error;
pub mod testing_utils;

// Re-export commonly used types for convenience
pub use clock::{Clock, SystemClock, TimeContext, ViewerZone};
pub use config::Config;
pub use data_fetcher::cache::{
    BucketRead, CacheKey, CacheStats, DataSource, FixtureCache, FreshnessPolicy,
};
pub use data_fetcher::models::{Fixture, FixtureStatus};
pub use data_fetcher::processors::{DateBucket, LifecycleClass, classify_fixture, classify_for_date};
pub use error::AppError;

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
