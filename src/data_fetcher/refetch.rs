//! One in-flight upstream refetch per cache key

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::data_fetcher::cache::CacheKey;
use crate::data_fetcher::models::Fixture;
use crate::error::AppError;

type FetchOutcome = Result<Arc<Vec<Fixture>>, Arc<AppError>>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;
type InFlight = Arc<Mutex<HashMap<CacheKey, SharedFetch>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<CacheKey, SharedFetch>> {
    in_flight
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Deduplicates concurrent refetches of the same key.
///
/// The first caller for a key starts the fetch; callers arriving while it
/// runs await the same shared future and receive the same result. The key is
/// released when the fetch completes, whichever waiter drives it.
#[derive(Clone, Default)]
pub struct RefetchGuard {
    in_flight: InFlight,
}

impl fmt::Debug for RefetchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefetchGuard")
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

impl RefetchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `fetch` for `key` unless a fetch for it is already in flight,
    /// in which case that fetch's result is awaited instead.
    ///
    /// Errors reach every waiter as [`AppError::SharedFetch`].
    pub async fn run<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Arc<Vec<Fixture>>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Fixture>, AppError>> + Send + 'static,
    {
        let shared = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&key) {
                Some(pending) => {
                    debug!("Joining in-flight refetch for {}", key);
                    pending.clone()
                }
                None => {
                    debug!("Starting refetch for {}", key);
                    let registry = Arc::clone(&self.in_flight);
                    let release_key = key.clone();
                    let fut = fetch();
                    let shared = async move {
                        let outcome = fut.await.map(Arc::new).map_err(Arc::new);
                        lock(&registry).remove(&release_key);
                        outcome
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, shared.clone());
                    shared
                }
            }
        };

        shared.await.map_err(AppError::SharedFetch)
    }

    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        lock(&self.in_flight).contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }
}
