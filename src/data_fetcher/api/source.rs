//! The upstream collaborator the cache is fed from

use chrono::NaiveDate;
use std::future::Future;

use crate::data_fetcher::models::Fixture;
use crate::error::AppError;

/// Upstream provider of fixture lists.
///
/// Both calls are idempotent. Errors surface to the caller unchanged; the
/// cache never retries on a source's behalf.
pub trait FixtureSource: Send + Sync {
    /// Every fixture scheduled on `date`
    fn fetch_fixtures_for_date(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Fixture>, AppError>> + Send;

    /// Every fixture currently in progress. Never served from cache.
    fn fetch_live_fixtures(&self) -> impl Future<Output = Result<Vec<Fixture>, AppError>> + Send;
}
