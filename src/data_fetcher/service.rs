//! Cache-first access to fixtures, backed by an upstream source

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::api::FixtureSource;
use super::cache::{CacheKey, DataSource, FixtureCache};
use super::models::Fixture;
use super::processors::{DateBucket, partition_for_date};
use super::refetch::RefetchGuard;
use crate::error::AppError;

/// Fixtures shown for one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DateFixtures {
    pub date: NaiveDate,
    pub bucket: DateBucket,
    pub fixtures: Vec<Fixture>,
    /// Not-started fixtures whose kickoff already passed; they belong under
    /// the next day once upstream updates their status
    pub deferred: Vec<Fixture>,
    /// True when no upstream call was made
    pub from_cache: bool,
}

/// Combines the cache, an upstream source and the refetch guard.
///
/// Cheap to clone; clones share the cache, the source and the in-flight map.
#[derive(Debug)]
pub struct FixtureService<S> {
    cache: Arc<FixtureCache>,
    source: Arc<S>,
    guard: RefetchGuard,
}

impl<S> Clone for FixtureService<S> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            source: Arc::clone(&self.source),
            guard: self.guard.clone(),
        }
    }
}

impl<S: FixtureSource + 'static> FixtureService<S> {
    pub fn new(cache: Arc<FixtureCache>, source: Arc<S>) -> Self {
        Self {
            cache,
            source,
            guard: RefetchGuard::new(),
        }
    }

    pub fn cache(&self) -> &Arc<FixtureCache> {
        &self.cache
    }

    /// Fixtures for `date`, from cache when the bucket is complete and fresh.
    ///
    /// Otherwise upstream is asked once, however many callers are waiting,
    /// and the time-filtered result is written back as the date's bucket.
    #[instrument(skip(self, date), fields(date = %date))]
    pub async fn fixtures_for_date(&self, date: NaiveDate) -> Result<DateFixtures, AppError> {
        if let Some(read) = self.cache.get_complete_bucket(date).await {
            debug!("Serving {} fixtures for {} from {}", read.fixtures.len(), date, read.source);
            return Ok(self.present(date, read.fixtures, true));
        }

        let cache = Arc::clone(&self.cache);
        let source = Arc::clone(&self.source);
        let fetched = self
            .guard
            .run(CacheKey::DateBucket(date), move || async move {
                let fixtures = source.fetch_fixtures_for_date(date).await?;
                let ctx = cache.time_context();
                let filtered = partition_for_date(fixtures, date, &ctx);
                for (fixture, reason) in &filtered.rejected {
                    debug!("Dropping fixture {} for {}: {}", fixture.id, date, reason);
                }

                let mut kept = filtered.matching;
                kept.extend(filtered.deferred);
                let report = cache.put_bucket(date, kept.clone(), DataSource::Api).await;
                info!(
                    "Refetched {}: {} cached, {} withheld, persisted={}",
                    date,
                    report.cached,
                    report.withheld.len(),
                    report.persisted
                );
                Ok::<_, AppError>(kept)
            })
            .await?;

        Ok(self.present(date, fetched.as_ref().clone(), false))
    }

    /// Fixtures in progress right now. Never served from cache; every status
    /// seen is fed to the transition tracker.
    #[instrument(skip(self))]
    pub async fn live_fixtures(&self) -> Result<Vec<Fixture>, AppError> {
        let fixtures = self.source.fetch_live_fixtures().await.map_err(|e| {
            warn!("Live poll failed: {}", e);
            e
        })?;

        for fixture in &fixtures {
            self.cache.put(fixture.clone(), DataSource::LivePoll).await;
        }
        Ok(fixtures)
    }

    fn present(&self, date: NaiveDate, fixtures: Vec<Fixture>, from_cache: bool) -> DateFixtures {
        let ctx = self.cache.time_context();
        let filtered = partition_for_date(fixtures, date, &ctx);
        DateFixtures {
            date,
            bucket: DateBucket::relative_to(date, ctx.today()),
            fixtures: filtered.matching,
            deferred: filtered.deferred,
            from_cache,
        }
    }
}
