//! Cache data structures

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data_fetcher::models::{Fixture, FixtureId};
use crate::error::AppError;

/// Identity of a cache entry.
///
/// Rendered as `fixture:<id>`, `fixtures:<ISO date>` and
/// `league:<leagueId>:<ISO date>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Fixture(FixtureId),
    DateBucket(NaiveDate),
    League { league_id: i64, date: NaiveDate },
}

impl CacheKey {
    /// Calendar date of list entries, `None` for single fixtures
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Fixture(_) => None,
            Self::DateBucket(date) | Self::League { date, .. } => Some(*date),
        }
    }

    pub fn is_list(&self) -> bool {
        !matches!(self, Self::Fixture(_))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixture(id) => write!(f, "fixture:{id}"),
            Self::DateBucket(date) => write!(f, "fixtures:{date}"),
            Self::League { league_id, date } => write!(f, "league:{league_id}:{date}"),
        }
    }
}

impl FromStr for CacheKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::config_error(format!("Invalid cache key '{s}'"));
        let parse_date = |raw: &str| raw.parse::<NaiveDate>().map_err(|_| invalid());

        let (kind, rest) = s.split_once(':').ok_or_else(invalid)?;
        match kind {
            "fixture" => rest.parse().map(Self::Fixture).map_err(|_| invalid()),
            "fixtures" => parse_date(rest).map(Self::DateBucket),
            "league" => {
                let (league_id, date) = rest.split_once(':').ok_or_else(invalid)?;
                Ok(Self::League {
                    league_id: league_id.parse().map_err(|_| invalid())?,
                    date: parse_date(date)?,
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Provenance tag recorded on every entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Regular upstream fetch
    Api,
    /// Live-fixtures poll
    LivePoll,
    /// Back-filled from the durable tier
    Persistent,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Api => "api",
            Self::LivePoll => "live_poll",
            Self::Persistent => "persistent",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePayload {
    Fixture(Box<Fixture>),
    /// A date bucket or league list. `withheld` holds ids of fixtures that were
    /// part of the upstream list but could not be cached when written.
    List {
        fixtures: Vec<Fixture>,
        withheld: Vec<FixtureId>,
    },
}

impl CachePayload {
    /// Every fixture id this payload refers to, withheld ones included
    pub fn fixture_ids(&self) -> Vec<FixtureId> {
        match self {
            Self::Fixture(fixture) => vec![fixture.id],
            Self::List { fixtures, withheld } => fixtures
                .iter()
                .map(|f| f.id)
                .chain(withheld.iter().copied())
                .collect(),
        }
    }

    pub fn find(&self, id: FixtureId) -> Option<&Fixture> {
        match self {
            Self::Fixture(fixture) => (fixture.id == id).then_some(fixture.as_ref()),
            Self::List { fixtures, .. } => fixtures.iter().find(|f| f.id == id),
        }
    }

    pub fn as_fixture(&self) -> Option<&Fixture> {
        match self {
            Self::Fixture(fixture) => Some(fixture),
            Self::List { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: CachePayload,
    pub written_at: DateTime<Utc>,
    /// TTL computed at write time; reads also apply the TTL recomputed at read time
    pub ttl: Duration,
    pub source: DataSource,
}

impl CacheEntry {
    pub fn new(
        key: CacheKey,
        payload: CachePayload,
        written_at: DateTime<Utc>,
        ttl: Duration,
        source: DataSource,
    ) -> Self {
        Self {
            key,
            payload,
            written_at,
            ttl,
            source,
        }
    }

    /// Age at `now`; clock skew never yields a negative age
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.written_at)
            .max(Duration::zero())
    }
}

/// Result of reading a date bucket or league list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRead {
    pub key: CacheKey,
    /// Members that are still fresh
    pub fixtures: Vec<Fixture>,
    /// Members the caller must refetch and merge: stale now or withheld at write
    pub stale: Vec<FixtureId>,
    pub source: DataSource,
    pub written_at: DateTime<Utc>,
}

impl BucketRead {
    pub fn is_complete(&self) -> bool {
        self.stale.is_empty()
    }
}

/// What `put` did with a single fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored { ttl: Duration },
    /// Not cacheable in its current lifecycle state; any previous copy was dropped
    Skipped,
}

/// What a list write did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketWriteReport {
    pub key: CacheKey,
    pub cached: usize,
    pub withheld: Vec<FixtureId>,
    pub ttl: Duration,
    pub persisted: bool,
}

/// Counts from one maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub expired_entries: usize,
    pub pruned_transitions: usize,
    pub expired_records: usize,
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub persistent_size: usize,
    pub tracked_fixtures: usize,
    pub indexed_fixtures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::TestDataBuilder;

    #[test]
    fn test_cache_key_display_and_parse() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let keys = [
            (CacheKey::Fixture(42), "fixture:42"),
            (CacheKey::DateBucket(date), "fixtures:2025-03-10"),
            (
                CacheKey::League {
                    league_id: 39,
                    date,
                },
                "league:39:2025-03-10",
            ),
        ];

        for (key, rendered) in keys {
            assert_eq!(key.to_string(), rendered);
            assert_eq!(rendered.parse::<CacheKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_cache_key_parse_rejects_garbage() {
        for raw in ["", "fixture", "fixture:abc", "fixtures:2025-13-01", "league:39", "x:1"] {
            assert!(raw.parse::<CacheKey>().is_err(), "{raw} should not parse");
        }
    }

    #[test]
    fn test_payload_fixture_ids_include_withheld() {
        let payload = CachePayload::List {
            fixtures: vec![
                TestDataBuilder::fixture(1, "2025-03-10T12:00:00Z", "FT"),
                TestDataBuilder::fixture(2, "2025-03-10T14:00:00Z", "FT"),
            ],
            withheld: vec![3],
        };
        assert_eq!(payload.fixture_ids(), vec![1, 2, 3]);
        assert!(payload.find(2).is_some());
        assert!(payload.find(3).is_none());
        assert!(payload.as_fixture().is_none());
    }

    #[test]
    fn test_entry_age_never_negative() {
        let written_at = "2025-03-10T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let entry = CacheEntry::new(
            CacheKey::Fixture(1),
            CachePayload::Fixture(Box::new(TestDataBuilder::fixture(
                1,
                "2025-03-10T18:00:00Z",
                "NS",
            ))),
            written_at,
            Duration::hours(1),
            DataSource::Api,
        );

        assert_eq!(entry.age(written_at - Duration::minutes(5)), Duration::zero());
        assert_eq!(entry.age(written_at + Duration::minutes(5)), Duration::minutes(5));
    }
}
