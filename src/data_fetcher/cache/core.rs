use chrono::{Duration, NaiveDate};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, instrument, warn};

use super::durable_store::{DurableStore, FileStore};
use super::entry_store::EntryStore;
use super::freshness::{CalendarRelation, FreshnessPolicy};
use super::persistent::{PersistedRecord, PersistentTier, date_integrity_violation};
use super::transitions::{StatusTransition, TransitionTracker};
use super::types::{
    BucketRead, BucketWriteReport, CacheEntry, CacheKey, CachePayload, CacheStats, CleanupReport,
    DataSource, PutOutcome,
};
use crate::clock::{Clock, SystemClock, TimeContext, ViewerZone};
use crate::config::{Config, paths};
use crate::constants::store;
use crate::data_fetcher::models::{Fixture, FixtureId, FixtureStatus};
use crate::data_fetcher::processors::lifecycle::seconds;

/// Mutable state guarded by one lock so that index and transition updates
/// are atomic with the entry writes they belong to.
#[derive(Debug)]
struct CacheState {
    entries: EntryStore,
    transitions: TransitionTracker,
    /// Dates whose persisted record goes once the lock is released
    unpersist: Vec<NaiveDate>,
}

/// Lifecycle-aware fixture cache.
///
/// Construct once and share by `Arc`. Reads and writes never wait on network
/// I/O; the only I/O is the synchronous durable store behind the persistent
/// tier.
#[derive(Debug)]
pub struct FixtureCache {
    state: RwLock<CacheState>,
    policy: FreshnessPolicy,
    clock: Arc<dyn Clock>,
    persistent: Option<PersistentTier>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FixtureCache {
    /// Creates an in-memory cache holding at most `capacity` entries.
    pub fn new(capacity: usize, policy: FreshnessPolicy) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(store::DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            state: RwLock::new(CacheState {
                entries: EntryStore::new(capacity),
                transitions: TransitionTracker::new(seconds(
                    store::TRANSITION_RETENTION_SECONDS,
                )),
                unpersist: Vec::new(),
            }),
            policy,
            clock: Arc::new(SystemClock::default()),
            persistent: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_persistent_tier(mut self, tier: PersistentTier) -> Self {
        self.persistent = Some(tier);
        self
    }

    pub fn with_transition_retention(mut self, retention: Duration) -> Self {
        self.state.get_mut().transitions = TransitionTracker::new(retention);
        self
    }

    /// Builds the cache described by the configuration.
    ///
    /// A durable store that cannot be opened is logged and the cache runs
    /// memory-only.
    pub fn from_config(config: &Config) -> Self {
        let mut cache = Self::new(config.cache.capacity, FreshnessPolicy::from(&config.policy))
            .with_transition_retention(seconds(config.policy.transition_retention_seconds));

        if let Some(name) = &config.timezone {
            match ViewerZone::parse(name) {
                Ok(zone) => cache = cache.with_clock(Arc::new(SystemClock::in_zone(zone))),
                Err(e) => warn!("{}. Using the host timezone", e),
            }
        }

        if !config.cache.persistent {
            info!("Persistent tier disabled by configuration");
            return cache;
        }

        let path = config
            .cache
            .persistent_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(paths::get_persistent_store_path);

        let tier = FileStore::open(&path, config.cache.quota_bytes).and_then(|store| {
            let store: Arc<dyn DurableStore> = Arc::new(store);
            PersistentTier::open(store, config.cache.preserved_keys.clone())
        });

        match tier {
            Ok(tier) => cache.with_persistent_tier(tier),
            Err(e) => {
                warn!(
                    "Failed to open durable store at {}: {}. Continuing without persistence",
                    path.display(),
                    e
                );
                cache
            }
        }
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    pub fn time_context(&self) -> TimeContext {
        self.clock.context()
    }

    pub fn has_persistent_tier(&self) -> bool {
        self.persistent.is_some()
    }

    /// Returns the entry for `key` if it may still be served.
    ///
    /// List entries come back with stale members moved from `fixtures` to
    /// `withheld`. Only the in-memory store is consulted; use
    /// [`Self::get_bucket`] for the persistent fallback.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let ctx = self.clock.context();
        let mut state = self.state.write().await;

        let result = match key {
            CacheKey::Fixture(id) => self.read_fixture(&mut state.entries, *id, &ctx),
            _ => self
                .read_list(&mut state.entries, key, &ctx)
                .and_then(|read| {
                    state.entries.peek(key).map(|entry| CacheEntry {
                        payload: CachePayload::List {
                            fixtures: read.fixtures,
                            withheld: read.stale,
                        },
                        ..entry.clone()
                    })
                }),
        };
        drop(state);

        self.record_lookup(result.is_some());
        result
    }

    /// Cached copy of a single fixture, if fresh
    pub async fn get_fixture(&self, id: FixtureId) -> Option<Fixture> {
        self.get(&CacheKey::Fixture(id))
            .await
            .and_then(|entry| entry.payload.as_fixture().cloned())
    }

    /// Reads the date bucket for `date`, falling back to the persistent tier
    /// for past dates. A hit may be partial: see [`BucketRead::stale`].
    #[instrument(skip(self, date), fields(date = %date))]
    pub async fn get_bucket(&self, date: NaiveDate) -> Option<BucketRead> {
        let result = self.lookup_bucket(date).await;
        self.record_lookup(result.is_some());
        result
    }

    #[instrument(skip(self, date), fields(date = %date))]
    pub async fn get_league(&self, league_id: i64, date: NaiveDate) -> Option<BucketRead> {
        let ctx = self.clock.context();
        let key = CacheKey::League { league_id, date };
        let result = {
            let mut state = self.state.write().await;
            self.read_list(&mut state.entries, &key, &ctx)
        };
        self.record_lookup(result.is_some());
        result
    }

    /// The bucket for `date` when it can be served without going upstream:
    /// present, fresh and with nothing stale or withheld.
    ///
    /// Counts as exactly one lookup; a partial bucket is a miss.
    #[instrument(skip(self, date), fields(date = %date))]
    pub async fn get_complete_bucket(&self, date: NaiveDate) -> Option<BucketRead> {
        let result = self
            .lookup_bucket(date)
            .await
            .filter(BucketRead::is_complete);
        self.record_lookup(result.is_some());
        result
    }

    /// Whether the caller must go upstream for `date`: a full miss, or a hit
    /// with members that are stale or were withheld. Not counted in the stats.
    pub async fn should_refetch(&self, date: NaiveDate) -> bool {
        let refetch = !self
            .lookup_bucket(date)
            .await
            .is_some_and(|read| read.is_complete());
        debug!("should_refetch({}) = {}", date, refetch);
        refetch
    }

    /// Stores a single fixture.
    ///
    /// The status is observed first, so a transition invalidates dependent
    /// entries before the new copy lands.
    #[instrument(skip(self, fixture), fields(fixture_id = fixture.id, status = %fixture.status.code))]
    pub async fn put(&self, fixture: Fixture, source: DataSource) -> PutOutcome {
        let ctx = self.clock.context();
        let mut state = self.state.write().await;
        self.observe(&mut state, fixture.id, &fixture.status.code, &ctx);

        let key = CacheKey::Fixture(fixture.id);
        let class = self.policy.classify(&fixture, ctx.now);
        let ttl = self.policy.ttl_for(class);
        let outcome = if ttl <= Duration::zero() {
            if state.entries.remove(&key).is_some() {
                debug!("Dropped previous copy of {} ({})", key, class.label());
            }
            debug!("Not caching {}: {}", key, class.label());
            PutOutcome::Skipped
        } else {
            state.entries.insert(CacheEntry::new(
                key.clone(),
                CachePayload::Fixture(Box::new(fixture)),
                ctx.now,
                ttl,
                source,
            ));
            debug!(
                "Cached {} as {} for {}s",
                key,
                class.label(),
                ttl.num_seconds()
            );
            PutOutcome::Stored { ttl }
        };
        self.release(state);
        outcome
    }

    /// Stores the fixtures of one calendar date.
    ///
    /// Must-not-cache fixtures are withheld and recorded on the entry. Past
    /// dates whose members are all cached and concluded are also persisted.
    #[instrument(skip(self, date, fixtures), fields(date = %date, count = fixtures.len()))]
    pub async fn put_bucket(
        &self,
        date: NaiveDate,
        fixtures: Vec<Fixture>,
        source: DataSource,
    ) -> BucketWriteReport {
        self.put_list(CacheKey::DateBucket(date), fixtures, source)
            .await
    }

    /// Stores the fixtures of one league on one date. Never persisted.
    #[instrument(skip(self, date, fixtures), fields(date = %date, count = fixtures.len()))]
    pub async fn put_league(
        &self,
        league_id: i64,
        date: NaiveDate,
        fixtures: Vec<Fixture>,
        source: DataSource,
    ) -> BucketWriteReport {
        self.put_list(CacheKey::League { league_id, date }, fixtures, source)
            .await
    }

    /// Feeds a status seen outside a full write, such as a live poll
    #[instrument(skip(self))]
    pub async fn record_observed_status(
        &self,
        fixture_id: FixtureId,
        status: FixtureStatus,
    ) -> Option<StatusTransition> {
        let ctx = self.clock.context();
        let mut state = self.state.write().await;
        let transition = self.observe(&mut state, fixture_id, &status, &ctx);
        self.release(state);
        transition
    }

    /// Drops one entry. Date buckets also lose their persisted record.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        let mut state = self.state.write().await;
        let removed = state.entries.remove(key).is_some();
        drop(state);

        if let CacheKey::DateBucket(date) = key {
            self.remove_persisted(*date);
        }
        if removed {
            info!("Invalidated {}", key);
        }
        removed
    }

    /// Drops every entry referring to `fixture_id`, returning how many went
    pub async fn invalidate_fixture(&self, fixture_id: FixtureId) -> usize {
        let mut state = self.state.write().await;
        let keys = state.entries.keys_for_fixture(fixture_id);
        let removed = Self::remove_keys(&mut state, &keys);
        self.release(state);
        info!("Invalidated {} entries for fixture {}", removed, fixture_id);
        removed
    }

    /// Empties the in-memory store and the transition records.
    /// The persistent tier is left alone.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.transitions.clear();
        info!("Cleared fixture cache");
    }

    /// Deletes every persisted record
    pub fn purge_persistent(&self) -> usize {
        let Some(tier) = &self.persistent else {
            return 0;
        };
        match tier.clear() {
            Ok(removed) => {
                info!("Purged {} persisted records", removed);
                removed
            }
            Err(e) => {
                warn!("Failed to purge persisted records: {}", e);
                0
            }
        }
    }

    /// Removes expired entries, idle transition records and expired
    /// persisted records, judged by the same policy readers use.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> CleanupReport {
        let ctx = self.clock.context();
        let (expired_entries, pruned_transitions) = {
            let mut state = self.state.write().await;
            let expired = state
                .entries
                .remove_where(|entry| !self.policy.is_entry_fresh(entry, &ctx));
            let pruned = state.transitions.prune(ctx.now);
            (expired, pruned)
        };

        let expired_records = self
            .persistent
            .as_ref()
            .map_or(0, |tier| tier.purge_expired(&self.policy, &ctx));

        let report = CleanupReport {
            expired_entries,
            pruned_transitions,
            expired_records,
        };
        if report != CleanupReport::default() {
            info!(
                "Cache cleanup: {} expired entries, {} transition records, {} persisted records",
                expired_entries, pruned_transitions, expired_records
            );
        }
        report
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            size: state.entries.len(),
            capacity: state.entries.cap(),
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            persistent_size: self.persistent.as_ref().map_or(0, PersistentTier::len),
            tracked_fixtures: state.transitions.len(),
            indexed_fixtures: state.entries.indexed_fixtures(),
        }
    }

    fn record_lookup(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Memory first, then the persistent tier with back-fill
    async fn lookup_bucket(&self, date: NaiveDate) -> Option<BucketRead> {
        let ctx = self.clock.context();
        let key = CacheKey::DateBucket(date);
        let mut state = self.state.write().await;

        if let Some(read) = self.read_list(&mut state.entries, &key, &ctx) {
            return Some(read);
        }

        if CalendarRelation::of(date, ctx.today()) != CalendarRelation::Past {
            return None;
        }
        let record = self.persistent.as_ref()?.read(date, &self.policy, &ctx)?;

        // Back-filled entries count their age from the back-fill: the record
        // was just validated against its own retention.
        info!(
            "Restored {} fixtures for {} from persistent tier (written {})",
            record.fixtures.len(),
            date,
            record.written_at
        );
        state.entries.insert(CacheEntry::new(
            key.clone(),
            CachePayload::List {
                fixtures: record.fixtures,
                withheld: Vec::new(),
            },
            ctx.now,
            self.policy.bucket_ttl(date, &ctx),
            DataSource::Persistent,
        ));
        self.read_list(&mut state.entries, &key, &ctx)
    }

    fn read_fixture(
        &self,
        entries: &mut EntryStore,
        id: FixtureId,
        ctx: &TimeContext,
    ) -> Option<CacheEntry> {
        let key = CacheKey::Fixture(id);
        let entry = entries.get(&key)?;
        if self.policy.is_entry_fresh(entry, ctx) {
            debug!("Cache hit for {} (age {}s)", key, entry.age(ctx.now).num_seconds());
            return Some(entry.clone());
        }

        debug!(
            "Removing stale {} (age {}s, ttl {}s)",
            key,
            entry.age(ctx.now).num_seconds(),
            entry.ttl.num_seconds()
        );
        entries.remove(&key);
        None
    }

    /// Reads a list entry, re-checking each member with its read-time TTL.
    ///
    /// An expired envelope or a member dated outside the key's date removes
    /// the entry.
    fn read_list(
        &self,
        entries: &mut EntryStore,
        key: &CacheKey,
        ctx: &TimeContext,
    ) -> Option<BucketRead> {
        let date = key.date()?;
        let verdict = {
            let entry = entries.get(key)?;
            match &entry.payload {
                CachePayload::List { fixtures, withheld } => {
                    if !self.policy.is_entry_fresh(entry, ctx) {
                        Err(format!(
                            "expired (age {}s, ttl {}s)",
                            entry.age(ctx.now).num_seconds(),
                            entry.ttl.num_seconds()
                        ))
                    } else if let Some(violation) =
                        date_integrity_violation(fixtures, date, &ctx.zone)
                    {
                        Err(violation)
                    } else {
                        let (fresh, stale): (Vec<&Fixture>, Vec<&Fixture>) =
                            fixtures.iter().partition(|fixture| {
                                self.policy.is_fixture_fresh(
                                    fixture,
                                    entry.written_at,
                                    entry.ttl,
                                    ctx.now,
                                )
                            });
                        Ok(BucketRead {
                            key: key.clone(),
                            fixtures: fresh.into_iter().cloned().collect(),
                            stale: stale
                                .iter()
                                .map(|fixture| fixture.id)
                                .chain(withheld.iter().copied())
                                .collect(),
                            source: entry.source,
                            written_at: entry.written_at,
                        })
                    }
                }
                CachePayload::Fixture(_) => Err("holds a single fixture".to_string()),
            }
        };

        match verdict {
            Ok(read) => {
                debug!(
                    "Cache hit for {}: {} fresh, {} to refetch",
                    key,
                    read.fixtures.len(),
                    read.stale.len()
                );
                Some(read)
            }
            Err(reason) => {
                warn!("Removing cache entry {}: {}", key, reason);
                entries.remove(key);
                None
            }
        }
    }

    async fn put_list(
        &self,
        key: CacheKey,
        fixtures: Vec<Fixture>,
        source: DataSource,
    ) -> BucketWriteReport {
        let ctx = self.clock.context();
        // List keys always carry a date
        let date = key.date().unwrap_or_else(|| ctx.today());

        let mut state = self.state.write().await;
        for fixture in &fixtures {
            self.observe(&mut state, fixture.id, &fixture.status.code, &ctx);
        }

        let (cacheable, uncacheable): (Vec<Fixture>, Vec<Fixture>) = fixtures
            .into_iter()
            .partition(|fixture| self.policy.should_cache(fixture, ctx.now));
        let withheld: Vec<FixtureId> = uncacheable.iter().map(|f| f.id).collect();
        let ttl = self.policy.bucket_ttl(date, &ctx);

        let persist = matches!(key, CacheKey::DateBucket(_))
            && self.persistent.is_some()
            && CalendarRelation::of(date, ctx.today()) == CalendarRelation::Past
            && withheld.is_empty()
            && cacheable.iter().all(|f| f.status.code.is_terminal());
        let record = persist.then(|| PersistedRecord {
            date,
            fixtures: cacheable.clone(),
            written_at: ctx.now,
        });

        let cached = cacheable.len();
        state.entries.insert(CacheEntry::new(
            key.clone(),
            CachePayload::List {
                fixtures: cacheable,
                withheld: withheld.clone(),
            },
            ctx.now,
            ttl,
            source,
        ));
        self.release(state);

        info!(
            "Cached {} with {} fixtures ({} withheld) for {}s",
            key,
            cached,
            withheld.len(),
            ttl.num_seconds()
        );

        let persisted = match (&self.persistent, record) {
            (Some(tier), Some(record)) => match tier.write(&record) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to persist {}: {}", key, e);
                    false
                }
            },
            _ => false,
        };

        BucketWriteReport {
            key,
            cached,
            withheld,
            ttl,
            persisted,
        }
    }

    /// Records a status and invalidates what the transition touches. Idle
    /// transition records are pruned first, on every call.
    fn observe(
        &self,
        state: &mut CacheState,
        fixture_id: FixtureId,
        status: &FixtureStatus,
        ctx: &TimeContext,
    ) -> Option<StatusTransition> {
        state.transitions.prune(ctx.now);
        let fallback = state.entries.cached_status(fixture_id);
        let transition = state
            .transitions
            .observe(fixture_id, status, fallback, ctx.now);

        let transition = transition?;
        let keys = if transition.kind.invalidates_lists() {
            state.entries.keys_for_fixture(fixture_id)
        } else {
            vec![CacheKey::Fixture(fixture_id)]
        };
        let removed = Self::remove_keys(state, &keys);
        info!(
            "Fixture {} {} ({} -> {}), invalidated {} entries",
            fixture_id, transition.kind, transition.from, transition.to, removed
        );
        Some(transition)
    }

    /// Removes `keys` from memory and queues their persisted records
    fn remove_keys(state: &mut CacheState, keys: &[CacheKey]) -> usize {
        let mut removed = 0;
        for key in keys {
            if state.entries.remove(key).is_some() {
                removed += 1;
            }
            if let CacheKey::DateBucket(date) = key
                && !state.unpersist.contains(date)
            {
                state.unpersist.push(*date);
            }
        }
        removed
    }

    /// Drops the state lock, then deletes the persisted records queued
    /// while it was held.
    fn release(&self, mut state: RwLockWriteGuard<'_, CacheState>) {
        let dates = std::mem::take(&mut state.unpersist);
        drop(state);
        for date in dates {
            self.remove_persisted(date);
        }
    }

    fn remove_persisted(&self, date: NaiveDate) {
        if let Some(tier) = &self.persistent
            && let Err(e) = tier.remove(date)
        {
            warn!("Failed to remove persisted record for {}: {}", date, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_fetcher::cache::durable_store::MemoryStore;
    use crate::data_fetcher::cache::transitions::TransitionKind;
    use crate::error::AppError;
    use crate::testing_utils::{ManualClock, TestDataBuilder};
    use std::sync::atomic::AtomicBool;
    use std::sync::{OnceLock, Weak};

    /// Memory store that notes whether a record was deleted while the cache
    /// state lock was held
    #[derive(Debug, Default)]
    struct LockCheckingStore {
        inner: MemoryStore,
        cache: OnceLock<Weak<FixtureCache>>,
        removed_under_lock: AtomicBool,
    }

    impl DurableStore for LockCheckingStore {
        fn get(&self, key: &str) -> Result<Option<String>, AppError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), AppError> {
            if let Some(cache) = self.cache.get().and_then(Weak::upgrade)
                && cache.state.try_read().is_err()
            {
                self.removed_under_lock.store(true, Ordering::SeqCst);
            }
            self.inner.remove(key)
        }

        fn keys(&self) -> Result<Vec<String>, AppError> {
            self.inner.keys()
        }
    }

    const NOW: &str = "2025-03-10T18:00:00Z";

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn cache_at(now: &str) -> (FixtureCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at(now));
        let cache = FixtureCache::new(100, FreshnessPolicy::default()).with_clock(clock.clone());
        (cache, clock)
    }

    fn persistent_cache_at(now: &str, store: Arc<MemoryStore>) -> (FixtureCache, Arc<ManualClock>) {
        let (cache, clock) = cache_at(now);
        let preserved = vec!["auth-session".to_string()];
        let tier = PersistentTier::open(store, preserved).unwrap();
        (cache.with_persistent_tier(tier), clock)
    }

    #[tokio::test]
    async fn test_put_and_get_cacheable_fixture() {
        let (cache, _) = cache_at(NOW);
        let fixture = TestDataBuilder::fixture(1, "2025-03-11T20:00:00Z", "NS");

        let outcome = cache.put(fixture.clone(), DataSource::Api).await;
        assert_eq!(
            outcome,
            PutOutcome::Stored {
                ttl: Duration::hours(24)
            }
        );
        assert_eq!(cache.get_fixture(1).await, Some(fixture.clone()));

        // Same data twice serves the same payload
        cache.put(fixture.clone(), DataSource::Api).await;
        assert_eq!(cache.get_fixture(1).await, Some(fixture));
    }

    #[tokio::test]
    async fn test_live_fixture_is_never_stored() {
        let (cache, _) = cache_at(NOW);
        let live = TestDataBuilder::live(2, "2025-03-10T17:00:00Z", 55);

        assert_eq!(cache.put(live, DataSource::LivePoll).await, PutOutcome::Skipped);
        assert!(cache.get(&CacheKey::Fixture(2)).await.is_none());
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_near_kickoff_fixture_expires_after_two_minutes() {
        let (cache, clock) = cache_at(NOW);
        let fixture = TestDataBuilder::fixture(3, "2025-03-10T19:00:00Z", "NS");
        cache.put(fixture, DataSource::Api).await;

        clock.advance(Duration::seconds(90));
        assert!(cache.get_fixture(3).await.is_some());

        clock.advance(Duration::seconds(60));
        assert!(cache.get_fixture(3).await.is_none());
    }

    #[tokio::test]
    async fn test_put_bucket_returns_cacheable_subset() {
        let (cache, _) = cache_at(NOW);
        let upcoming = TestDataBuilder::fixture(1, "2025-03-10T21:00:00Z", "NS");
        let old = TestDataBuilder::finished(2, "2025-03-10T10:00:00Z", 2, 1);
        let live = TestDataBuilder::live(3, "2025-03-10T17:15:00Z", 40);

        let report = cache
            .put_bucket(
                date(10),
                vec![upcoming.clone(), old.clone(), live],
                DataSource::Api,
            )
            .await;
        assert_eq!(report.cached, 2);
        assert_eq!(report.withheld, vec![3]);
        assert!(!report.persisted);

        let read = cache.get_bucket(date(10)).await.unwrap();
        assert_eq!(read.fixtures, vec![upcoming, old]);
        assert_eq!(read.stale, vec![3]);
        assert!(!read.is_complete());
        assert!(cache.should_refetch(date(10)).await);
    }

    #[tokio::test]
    async fn test_stale_member_withheld_but_bucket_served() {
        let (cache, clock) = cache_at(NOW);
        let soon = TestDataBuilder::fixture(1, "2025-03-10T19:00:00Z", "NS");
        let old = TestDataBuilder::finished(2, "2025-03-10T10:00:00Z", 0, 0);
        cache
            .put_bucket(date(10), vec![soon, old.clone()], DataSource::Api)
            .await;
        assert!(!cache.should_refetch(date(10)).await);

        // Past the 2 minute TTL of the near-kickoff member only
        clock.advance(Duration::minutes(5));
        let read = cache.get_bucket(date(10)).await.unwrap();
        assert_eq!(read.fixtures, vec![old]);
        assert_eq!(read.stale, vec![1]);

        // Today's bucket envelope expires after 30 minutes
        clock.advance(Duration::minutes(30));
        assert!(cache.get_bucket(date(10)).await.is_none());
        assert!(cache.should_refetch(date(10)).await);
    }

    #[tokio::test]
    async fn test_transitions_invalidate_fixture_and_buckets() {
        let (cache, _) = cache_at(NOW);
        let scheduled = TestDataBuilder::fixture(9, "2025-03-10T19:30:00Z", "NS");
        cache.put(scheduled.clone(), DataSource::Api).await;
        cache
            .put_bucket(date(10), vec![scheduled.clone()], DataSource::Api)
            .await;
        cache
            .put_league(39, date(10), vec![scheduled.clone()], DataSource::Api)
            .await;

        // Repeating the same status invalidates nothing
        assert!(
            cache
                .record_observed_status(9, FixtureStatus::NotStarted)
                .await
                .is_none()
        );
        assert_eq!(cache.stats().await.size, 3);

        let started = cache
            .record_observed_status(9, FixtureStatus::FirstHalf)
            .await
            .unwrap();
        assert_eq!(started.kind, TransitionKind::Started);
        assert_eq!(cache.stats().await.size, 0);
        assert!(cache.get_league(39, date(10)).await.is_none());
    }

    #[tokio::test]
    async fn test_phase_change_keeps_lists() {
        let (cache, _) = cache_at(NOW);
        let old = TestDataBuilder::finished(4, "2025-03-10T10:00:00Z", 1, 1);
        let live = TestDataBuilder::live(5, "2025-03-10T17:00:00Z", 60);
        cache
            .put_bucket(date(10), vec![old, live], DataSource::Api)
            .await;

        let change = cache
            .record_observed_status(5, FixtureStatus::ExtraTime)
            .await
            .unwrap();
        assert_eq!(change.kind, TransitionKind::PhaseChange);
        assert!(cache.get_bucket(date(10)).await.is_some());
    }

    #[tokio::test]
    async fn test_withheld_fixture_transition_invalidates_bucket() {
        let (cache, _) = cache_at(NOW);
        let old = TestDataBuilder::finished(1, "2025-03-10T10:00:00Z", 1, 0);
        let live = TestDataBuilder::live(2, "2025-03-10T17:00:00Z", 60);
        cache
            .put_bucket(date(10), vec![old, live.clone()], DataSource::Api)
            .await;

        let finished = TestDataBuilder::with_status(&live, "FT");
        cache.put(finished, DataSource::LivePoll).await;
        assert!(cache.get_bucket(date(10)).await.is_none());
    }

    #[tokio::test]
    async fn test_cached_copy_supplies_previous_status() {
        let (cache, clock) = cache_at(NOW);
        let fixture = TestDataBuilder::fixture(6, "2025-03-11T20:00:00Z", "NS");
        cache.put(fixture, DataSource::Api).await;

        // The transition record goes idle, the cached copy stays fresh
        clock.advance(Duration::hours(2));
        assert_eq!(cache.cleanup().await.pruned_transitions, 1);
        assert!(cache.get_fixture(6).await.is_some());

        let transition = cache
            .record_observed_status(6, FixtureStatus::FirstHalf)
            .await
            .unwrap();
        assert_eq!(transition.kind, TransitionKind::Started);
        assert_eq!(transition.from, FixtureStatus::NotStarted);
        assert!(cache.get_fixture(6).await.is_none());
    }

    #[tokio::test]
    async fn test_integrity_violation_invalidates_bucket() {
        let (cache, _) = cache_at(NOW);
        let stray = TestDataBuilder::finished(7, "2025-03-08T10:00:00Z", 0, 0);
        cache
            .put_bucket(date(9), vec![stray], DataSource::Api)
            .await;

        assert!(cache.get_bucket(date(9)).await.is_none());
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_past_bucket_persisted_and_restored() {
        let store = Arc::new(MemoryStore::new());
        let fixtures = TestDataBuilder::finished_day(100, "2025-03-05", 5);

        let (cache, _) = persistent_cache_at(NOW, store.clone());
        let report = cache
            .put_bucket(date(5), fixtures.clone(), DataSource::Api)
            .await;
        assert!(report.persisted);
        assert_eq!(cache.stats().await.persistent_size, 1);

        // Simulated restart over the same durable store
        let (restarted, _) = persistent_cache_at(NOW, store);
        let read = restarted.get_bucket(date(5)).await.unwrap();
        assert_eq!(read.fixtures, fixtures);
        assert_eq!(read.source, DataSource::Persistent);
        assert!(!restarted.should_refetch(date(5)).await);
    }

    #[tokio::test]
    async fn test_past_bucket_with_unfinished_fixture_not_persisted() {
        let store = Arc::new(MemoryStore::new());
        let (cache, _) = persistent_cache_at(NOW, store);
        let mut fixtures = TestDataBuilder::finished_day(100, "2025-03-05", 2);
        fixtures.push(TestDataBuilder::fixture(200, "2025-03-05T19:00:00Z", "NS"));

        let report = cache
            .put_bucket(date(5), fixtures, DataSource::Api)
            .await;
        assert!(!report.persisted);
        assert_eq!(cache.stats().await.persistent_size, 0);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let (cache, clock) = cache_at(NOW);
        cache
            .put(
                TestDataBuilder::fixture(1, "2025-03-10T19:00:00Z", "NS"),
                DataSource::Api,
            )
            .await;
        cache
            .put(
                TestDataBuilder::fixture(2, "2025-03-12T19:00:00Z", "NS"),
                DataSource::Api,
            )
            .await;

        clock.advance(Duration::minutes(90));
        let report = cache.cleanup().await;
        assert_eq!(report.expired_entries, 1);
        assert_eq!(report.pruned_transitions, 2);
        assert!(cache.get_fixture(2).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_and_stats() {
        let (cache, _) = cache_at(NOW);
        let fixture = TestDataBuilder::fixture(1, "2025-03-11T20:00:00Z", "NS");
        cache.put(fixture.clone(), DataSource::Api).await;
        cache
            .put_bucket(date(11), vec![fixture], DataSource::Api)
            .await;

        assert!(cache.get_fixture(1).await.is_some());
        assert!(cache.get_fixture(99).await.is_none());
        assert_eq!(cache.invalidate_fixture(1).await, 2);
        assert!(!cache.invalidate(&CacheKey::Fixture(1)).await);

        let stats = cache.stats().await;
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_purge_persistent_removes_every_record() {
        let store = Arc::new(MemoryStore::new());
        store.set("auth-session", "token").unwrap();
        let (cache, _) = persistent_cache_at(NOW, store.clone());
        for day in [4, 5] {
            let fixtures = TestDataBuilder::finished_day(100 * day as i64, &date(day).to_string(), 2);
            assert!(cache.put_bucket(date(day), fixtures, DataSource::Api).await.persisted);
        }
        assert_eq!(cache.stats().await.persistent_size, 2);

        assert_eq!(cache.purge_persistent(), 2);
        assert_eq!(cache.stats().await.persistent_size, 0);
        assert_eq!(store.get("auth-session").unwrap().as_deref(), Some("token"));

        let (restarted, _) = persistent_cache_at(NOW, store);
        assert!(restarted.get_bucket(date(4)).await.is_none());
        assert!(restarted.get_bucket(date(5)).await.is_none());
    }

    #[tokio::test]
    async fn test_purge_persistent_without_tier_is_noop() {
        let (cache, _) = cache_at(NOW);
        assert!(!cache.has_persistent_tier());
        assert_eq!(cache.purge_persistent(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_bucket_deletes_persisted_record() {
        let store = Arc::new(MemoryStore::new());
        let (cache, _) = persistent_cache_at(NOW, store.clone());
        let fixtures = TestDataBuilder::finished_day(100, "2025-03-05", 3);
        assert!(cache.put_bucket(date(5), fixtures, DataSource::Api).await.persisted);

        assert!(cache.invalidate(&CacheKey::DateBucket(date(5))).await);
        assert_eq!(cache.stats().await.persistent_size, 0);

        let (restarted, _) = persistent_cache_at(NOW, store);
        assert!(restarted.get_bucket(date(5)).await.is_none());
        assert!(restarted.should_refetch(date(5)).await);
    }

    #[tokio::test]
    async fn test_transition_deletes_past_bucket_record() {
        let store = Arc::new(MemoryStore::new());
        let (cache, _) = persistent_cache_at(NOW, store.clone());
        let fixtures = TestDataBuilder::finished_day(100, "2025-03-05", 3);
        assert!(cache.put_bucket(date(5), fixtures, DataSource::Api).await.persisted);

        // A concluded fixture reported in progress again
        let transition = cache
            .record_observed_status(101, FixtureStatus::FirstHalf)
            .await
            .unwrap();
        assert_eq!(transition.kind, TransitionKind::Irregular);
        assert!(cache.get(&CacheKey::DateBucket(date(5))).await.is_none());
        assert_eq!(cache.stats().await.persistent_size, 0);

        let (restarted, _) = persistent_cache_at(NOW, store);
        assert!(restarted.get_bucket(date(5)).await.is_none());
    }

    #[tokio::test]
    async fn test_persisted_records_deleted_after_lock_released() {
        let store = Arc::new(LockCheckingStore::default());
        let tier = PersistentTier::open(store.clone(), vec![]).unwrap();
        let clock = Arc::new(ManualClock::at(NOW));
        let cache = Arc::new(
            FixtureCache::new(100, FreshnessPolicy::default())
                .with_clock(clock)
                .with_persistent_tier(tier),
        );
        store.cache.set(Arc::downgrade(&cache)).unwrap();

        let fixtures = TestDataBuilder::finished_day(100, "2025-03-05", 2);
        assert!(cache.put_bucket(date(5), fixtures.clone(), DataSource::Api).await.persisted);
        cache
            .record_observed_status(100, FixtureStatus::FirstHalf)
            .await
            .unwrap();
        assert_eq!(cache.stats().await.persistent_size, 0);

        assert!(cache.put_bucket(date(5), fixtures, DataSource::Api).await.persisted);
        assert_eq!(cache.invalidate_fixture(101).await, 1);
        assert_eq!(cache.stats().await.persistent_size, 0);

        assert!(!store.removed_under_lock.load(Ordering::SeqCst));
    }
}
