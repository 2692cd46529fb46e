//! TTL selection and the serve/expire decision shared by readers and maintenance

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::types::{CacheEntry, CachePayload, CacheKey};
use crate::clock::TimeContext;
use crate::config::PolicyConfig;
use crate::constants::{cache_ttl, persistence};
use crate::data_fetcher::models::Fixture;
use crate::data_fetcher::processors::lifecycle::seconds;
use crate::data_fetcher::processors::{LifecycleClass, LifecycleThresholds, classify_fixture};

/// Relation of a bucket's date to the viewer's today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarRelation {
    Past,
    Today,
    Future,
}

impl CalendarRelation {
    pub fn of(date: NaiveDate, today: NaiveDate) -> Self {
        match date.cmp(&today) {
            std::cmp::Ordering::Less => Self::Past,
            std::cmp::Ordering::Equal => Self::Today,
            std::cmp::Ordering::Greater => Self::Future,
        }
    }
}

/// TTLs of the cacheable lifecycle classes and of list buckets.
///
/// There is no slot for `Live` or `RecentlyEnded`: those are
/// never cacheable whatever the configuration says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlTable {
    pub old_ended: Duration,
    pub ancient_ended: Duration,
    pub upcoming_near: Duration,
    pub upcoming_far: Duration,
    pub past_bucket: Duration,
    pub today_bucket: Duration,
    pub future_bucket: Duration,
}

impl Default for TtlTable {
    fn default() -> Self {
        Self {
            old_ended: seconds(cache_ttl::OLD_ENDED_SECONDS),
            ancient_ended: seconds(cache_ttl::ANCIENT_ENDED_SECONDS),
            upcoming_near: seconds(cache_ttl::UPCOMING_NEAR_SECONDS),
            upcoming_far: seconds(cache_ttl::UPCOMING_FAR_SECONDS),
            past_bucket: seconds(cache_ttl::PAST_BUCKET_SECONDS),
            today_bucket: seconds(cache_ttl::TODAY_BUCKET_SECONDS),
            future_bucket: seconds(cache_ttl::FUTURE_BUCKET_SECONDS),
        }
    }
}

/// How long persisted records of past dates are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub recent_days: i64,
    pub recent: Duration,
    pub old: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            recent_days: persistence::RECENT_RECORD_DAYS,
            recent: seconds(persistence::RECENT_RETENTION_SECONDS),
            old: seconds(persistence::OLD_RETENTION_SECONDS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FreshnessPolicy {
    pub thresholds: LifecycleThresholds,
    pub ttls: TtlTable,
    pub retention: RetentionPolicy,
}

impl FreshnessPolicy {
    pub fn classify(&self, fixture: &Fixture, now: DateTime<Utc>) -> LifecycleClass {
        classify_fixture(fixture, now, &self.thresholds)
    }

    pub fn ttl_for(&self, class: LifecycleClass) -> Duration {
        match class {
            LifecycleClass::Live | LifecycleClass::RecentlyEnded => Duration::zero(),
            LifecycleClass::OldEnded { ancient: false } => self.ttls.old_ended,
            LifecycleClass::OldEnded { ancient: true } => self.ttls.ancient_ended,
            LifecycleClass::UpcomingNear => self.ttls.upcoming_near,
            LifecycleClass::UpcomingFar => self.ttls.upcoming_far,
        }
    }

    /// TTL of a single fixture at `now`; zero means must-not-cache
    pub fn fixture_ttl(&self, fixture: &Fixture, now: DateTime<Utc>) -> Duration {
        self.ttl_for(self.classify(fixture, now))
    }

    pub fn should_cache(&self, fixture: &Fixture, now: DateTime<Utc>) -> bool {
        self.fixture_ttl(fixture, now) > Duration::zero()
    }

    pub fn bucket_ttl(&self, date: NaiveDate, ctx: &TimeContext) -> Duration {
        match CalendarRelation::of(date, ctx.today()) {
            CalendarRelation::Past => self.ttls.past_bucket,
            CalendarRelation::Today => self.ttls.today_bucket,
            CalendarRelation::Future => self.ttls.future_bucket,
        }
    }

    /// A fixture written at `written_at` with `write_ttl` may still be served
    /// only while younger than both its write-time and its read-time TTL.
    pub fn is_fixture_fresh(
        &self,
        fixture: &Fixture,
        written_at: DateTime<Utc>,
        write_ttl: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        let age = now.signed_duration_since(written_at).max(Duration::zero());
        age < write_ttl && age < self.fixture_ttl(fixture, now)
    }

    /// Whether an entry as a whole may still be served.
    ///
    /// For lists this judges the envelope only; members are rechecked one by
    /// one with [`Self::is_fixture_fresh`] when the list is read.
    pub fn is_entry_fresh(&self, entry: &CacheEntry, ctx: &TimeContext) -> bool {
        let age = entry.age(ctx.now);
        if age >= entry.ttl {
            return false;
        }

        match (&entry.key, &entry.payload) {
            (_, CachePayload::Fixture(fixture)) => age < self.fixture_ttl(fixture, ctx.now),
            (CacheKey::DateBucket(date), _) | (CacheKey::League { date, .. }, _) => {
                age < self.bucket_ttl(*date, ctx)
            }
            (CacheKey::Fixture(_), CachePayload::List { .. }) => false,
        }
    }

    /// Retention of a persisted record for `date`
    pub fn persistent_retention(&self, date: NaiveDate, today: NaiveDate) -> Duration {
        if today.signed_duration_since(date).num_days() <= self.retention.recent_days {
            self.retention.recent
        } else {
            self.retention.old
        }
    }

    pub fn is_record_expired(
        &self,
        date: NaiveDate,
        written_at: DateTime<Utc>,
        ctx: &TimeContext,
    ) -> bool {
        let age = ctx.now.signed_duration_since(written_at).max(Duration::zero());
        age >= self.persistent_retention(date, ctx.today())
    }
}

impl From<&PolicyConfig> for FreshnessPolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            thresholds: LifecycleThresholds {
                suspect_live_after: seconds(config.suspect_live_after_seconds),
                match_duration: seconds(config.match_duration_seconds),
                recently_ended_window: seconds(config.recently_ended_window_seconds),
                old_ended_window: seconds(config.old_ended_window_seconds),
                near_kickoff_window: seconds(config.near_kickoff_window_seconds),
            },
            ttls: TtlTable {
                old_ended: seconds(config.old_ended_ttl_seconds),
                ancient_ended: seconds(config.ancient_ended_ttl_seconds),
                upcoming_near: seconds(config.upcoming_near_ttl_seconds),
                upcoming_far: seconds(config.upcoming_far_ttl_seconds),
                past_bucket: seconds(config.past_bucket_ttl_seconds),
                today_bucket: seconds(config.today_bucket_ttl_seconds),
                future_bucket: seconds(config.future_bucket_ttl_seconds),
            },
            retention: RetentionPolicy {
                recent_days: i64::from(config.recent_record_days),
                recent: seconds(config.recent_record_retention_seconds),
                old: seconds(config.old_record_retention_seconds),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_fetcher::cache::types::DataSource;
    use crate::testing_utils::TestDataBuilder;
    use chrono::Offset;

    fn now() -> DateTime<Utc> {
        "2025-03-10T18:00:00Z".parse().unwrap()
    }

    fn ctx() -> TimeContext {
        TimeContext::new(now(), Utc.fix())
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn test_ttl_table_per_class() {
        let policy = FreshnessPolicy::default();
        assert_eq!(policy.ttl_for(LifecycleClass::Live), Duration::zero());
        assert_eq!(policy.ttl_for(LifecycleClass::RecentlyEnded), Duration::zero());
        assert_eq!(
            policy.ttl_for(LifecycleClass::OldEnded { ancient: false }),
            Duration::hours(6)
        );
        assert_eq!(
            policy.ttl_for(LifecycleClass::OldEnded { ancient: true }),
            Duration::days(30)
        );
        assert_eq!(policy.ttl_for(LifecycleClass::UpcomingNear), Duration::minutes(2));
        assert_eq!(policy.ttl_for(LifecycleClass::UpcomingFar), Duration::hours(24));
    }

    #[test]
    fn test_live_never_cacheable_with_huge_ttls() {
        let mut policy = FreshnessPolicy::default();
        policy.ttls = TtlTable {
            old_ended: Duration::days(365),
            ancient_ended: Duration::days(365),
            upcoming_near: Duration::days(365),
            upcoming_far: Duration::days(365),
            past_bucket: Duration::days(365),
            today_bucket: Duration::days(365),
            future_bucket: Duration::days(365),
        };

        let live = TestDataBuilder::live(1, "2025-03-10T17:00:00Z", 60);
        let suspect = TestDataBuilder::fixture(2, "2025-03-10T12:00:00Z", "NS");
        let just_ended = TestDataBuilder::finished(3, "2025-03-10T16:00:00Z", 1, 0);
        for fixture in [&live, &suspect, &just_ended] {
            assert!(!policy.should_cache(fixture, now()), "{}", fixture.id);
        }
    }

    #[test]
    fn test_older_ended_fixtures_live_longer() {
        let policy = FreshnessPolicy::default();
        let recent = TestDataBuilder::finished(1, "2025-03-10T15:00:00Z", 1, 0);
        let older = TestDataBuilder::finished(2, "2025-03-10T10:00:00Z", 1, 0);
        let ancient = TestDataBuilder::finished(3, "2025-03-01T10:00:00Z", 1, 0);

        let recent_ttl = policy.fixture_ttl(&recent, now());
        let older_ttl = policy.fixture_ttl(&older, now());
        let ancient_ttl = policy.fixture_ttl(&ancient, now());
        assert!(older_ttl >= recent_ttl);
        assert!(ancient_ttl >= older_ttl);
    }

    #[test]
    fn test_bucket_ttl_by_calendar_relation() {
        let policy = FreshnessPolicy::default();
        assert_eq!(policy.bucket_ttl(date(9), &ctx()), Duration::days(7));
        assert_eq!(policy.bucket_ttl(date(10), &ctx()), Duration::minutes(30));
        assert_eq!(policy.bucket_ttl(date(11), &ctx()), Duration::hours(24));
        assert_eq!(CalendarRelation::of(date(1), date(10)), CalendarRelation::Past);
    }

    #[test]
    fn test_freshness_needs_both_ttls() {
        let policy = FreshnessPolicy::default();
        let upcoming = TestDataBuilder::fixture(1, "2025-03-11T20:00:00Z", "NS");
        let written = now() - Duration::minutes(10);

        // Read-time TTL is 24h, but the write-time TTL was only 5 minutes
        assert!(!policy.is_fixture_fresh(&upcoming, written, Duration::minutes(5), now()));
        assert!(policy.is_fixture_fresh(&upcoming, written, Duration::hours(24), now()));

        // Write-time TTL was long, but kickoff is now close: read-time TTL is 2 minutes
        let closing_in = TestDataBuilder::fixture(2, "2025-03-10T18:30:00Z", "NS");
        assert!(!policy.is_fixture_fresh(&closing_in, written, Duration::hours(24), now()));
    }

    #[test]
    fn test_entry_freshness_for_lists_uses_bucket_ttl() {
        let policy = FreshnessPolicy::default();
        let entry = CacheEntry::new(
            CacheKey::DateBucket(date(10)),
            CachePayload::List {
                fixtures: vec![],
                withheld: vec![],
            },
            now() - Duration::minutes(45),
            Duration::days(7),
            DataSource::Api,
        );
        // Written as a past bucket, read back as today's: 30 minute read-time TTL
        assert!(!policy.is_entry_fresh(&entry, &ctx()));
    }

    #[test]
    fn test_persistent_retention() {
        let policy = FreshnessPolicy::default();
        assert_eq!(policy.persistent_retention(date(5), date(10)), Duration::days(7));
        assert_eq!(policy.persistent_retention(date(3), date(10)), Duration::days(7));
        assert_eq!(policy.persistent_retention(date(1), date(10)), Duration::days(30));

        assert!(policy.is_record_expired(date(5), now() - Duration::days(8), &ctx()));
        assert!(!policy.is_record_expired(date(5), now() - Duration::days(6), &ctx()));
    }

    #[test]
    fn test_from_policy_config_defaults_match() {
        let policy = FreshnessPolicy::from(&PolicyConfig::default());
        assert_eq!(policy, FreshnessPolicy::default());
    }
}
