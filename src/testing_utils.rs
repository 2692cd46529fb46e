use chrono::{DateTime, Duration, Offset, Utc};
use std::sync::Mutex;

use crate::clock::{Clock, ViewerZone};
use crate::data_fetcher::models::{Fixture, FixtureStatus, League, StatusInfo, Team};

/// Test utilities for creating mock fixtures
pub struct TestDataBuilder;

impl TestDataBuilder {
    /// Creates a fixture with the given kickoff timestamp and status code
    pub fn fixture(id: i64, scheduled_at: &str, status: &str) -> Fixture {
        Fixture {
            id,
            scheduled_at: scheduled_at.to_string(),
            status: StatusInfo::new(FixtureStatus::from_code(status)),
            home_team: Team {
                id: id * 2,
                name: format!("Home {id}"),
                logo: None,
            },
            away_team: Team {
                id: id * 2 + 1,
                name: format!("Away {id}"),
                logo: None,
            },
            league: League {
                id: 39,
                name: "Premier League".to_string(),
                country: Some("England".to_string()),
                season: Some(2024),
            },
            score_home: None,
            score_away: None,
        }
    }

    /// Creates a fixture kicking off `offset` after `now`
    pub fn fixture_at(id: i64, now: DateTime<Utc>, offset: Duration, status: &str) -> Fixture {
        Self::fixture(id, &(now + offset).to_rfc3339(), status)
    }

    /// Creates a finished fixture with a final score
    pub fn finished(id: i64, scheduled_at: &str, home: i32, away: i32) -> Fixture {
        let mut fixture = Self::fixture(id, scheduled_at, "FT");
        fixture.score_home = Some(home);
        fixture.score_away = Some(away);
        fixture.status.elapsed_minutes = Some(90);
        fixture
    }

    /// Creates an in-progress fixture
    pub fn live(id: i64, scheduled_at: &str, elapsed: u32) -> Fixture {
        let mut fixture = Self::fixture(id, scheduled_at, "2H");
        fixture.score_home = Some(0);
        fixture.score_away = Some(0);
        fixture.status.elapsed_minutes = Some(elapsed);
        fixture
    }

    /// Returns a copy of `fixture` with a different status code
    pub fn with_status(fixture: &Fixture, status: &str) -> Fixture {
        let mut next = fixture.clone();
        next.status = StatusInfo::new(FixtureStatus::from_code(status));
        next
    }

    /// Creates `count` fixtures kicking off on the same day, one hour apart
    pub fn finished_day(first_id: i64, day: &str, count: usize) -> Vec<Fixture> {
        (0..count)
            .map(|i| {
                Self::finished(
                    first_id + i as i64,
                    &format!("{day}T{:02}:00:00Z", 12 + i),
                    i as i32,
                    1,
                )
            })
            .collect()
    }
}

/// Manually driven clock for deterministic tests
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    zone: ViewerZone,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>, zone: impl Into<ViewerZone>) -> Self {
        Self {
            now: Mutex::new(now),
            zone: zone.into(),
        }
    }

    /// Clock in UTC starting at the given RFC 3339 instant
    pub fn at(now: &str) -> Self {
        let now = DateTime::parse_from_rfc3339(now)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Self::new(now, Utc.fix())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn zone(&self) -> ViewerZone {
        self.zone
    }
}
