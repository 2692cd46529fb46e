use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::constants::lifecycle;
use crate::data_fetcher::models::{Fixture, FixtureStatus, Phase};
use crate::error::AppError;

/// Cache-oriented lifecycle bucket derived from status and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleClass {
    /// In progress, suspect-live, or not safely classifiable
    Live,
    /// Concluded, ended within the recent window; scores may still be amended
    RecentlyEnded,
    /// Concluded beyond the recent window. `ancient` marks the tier past a day.
    OldEnded { ancient: bool },
    /// Not started, kickoff close to now
    UpcomingNear,
    /// Not started, kickoff far from now
    UpcomingFar,
}

impl LifecycleClass {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::RecentlyEnded => "RECENTLY_ENDED",
            Self::OldEnded { ancient: false } => "OLD_ENDED",
            Self::OldEnded { ancient: true } => "OLD_ENDED_ANCIENT",
            Self::UpcomingNear => "UPCOMING_NEAR",
            Self::UpcomingFar => "UPCOMING_FAR",
        }
    }
}

/// Timing thresholds used by [`classify_lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleThresholds {
    pub suspect_live_after: Duration,
    pub match_duration: Duration,
    pub recently_ended_window: Duration,
    pub old_ended_window: Duration,
    pub near_kickoff_window: Duration,
}

impl Default for LifecycleThresholds {
    fn default() -> Self {
        Self {
            suspect_live_after: seconds(lifecycle::SUSPECT_LIVE_AFTER_SECONDS),
            match_duration: seconds(lifecycle::MATCH_DURATION_SECONDS),
            recently_ended_window: seconds(lifecycle::RECENTLY_ENDED_WINDOW_SECONDS),
            old_ended_window: seconds(lifecycle::OLD_ENDED_WINDOW_SECONDS),
            near_kickoff_window: seconds(lifecycle::NEAR_KICKOFF_WINDOW_SECONDS),
        }
    }
}

pub(crate) fn seconds(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1000))
}

/// Whether a not-started fixture has been overdue long enough that upstream
/// has probably just not flipped its status yet.
pub fn is_suspect_live(
    status: &FixtureStatus,
    kickoff: DateTime<Utc>,
    now: DateTime<Utc>,
    thresholds: &LifecycleThresholds,
) -> bool {
    status.is_not_started() && now.signed_duration_since(kickoff) > thresholds.suspect_live_after
}

/// Classifies a status and kickoff into a lifecycle class.
///
/// Anything the classifier cannot reason about safely (unrecognized status,
/// unparseable kickoff) is `Live`, which makes it uncacheable.
pub fn classify_lifecycle(
    status: &FixtureStatus,
    kickoff: Result<DateTime<Utc>, AppError>,
    now: DateTime<Utc>,
    thresholds: &LifecycleThresholds,
) -> LifecycleClass {
    let Some(phase) = status.phase() else {
        return LifecycleClass::Live;
    };
    let Ok(kickoff) = kickoff else {
        return LifecycleClass::Live;
    };
    let since_kickoff = now.signed_duration_since(kickoff);

    match phase {
        Phase::InProgress => LifecycleClass::Live,
        Phase::NotStarted => {
            if is_suspect_live(status, kickoff, now, thresholds) {
                debug!(
                    "Suspect-live: status {} but kickoff was {} minutes ago",
                    status,
                    since_kickoff.num_minutes()
                );
                LifecycleClass::Live
            } else if since_kickoff.abs() <= thresholds.near_kickoff_window {
                LifecycleClass::UpcomingNear
            } else {
                LifecycleClass::UpcomingFar
            }
        }
        Phase::Concluded => {
            // Called off before kickoff (postponed, cancelled): no score to amend
            if since_kickoff < Duration::zero() {
                return LifecycleClass::OldEnded { ancient: false };
            }
            let ended_ago = since_kickoff - thresholds.match_duration;
            if ended_ago <= thresholds.recently_ended_window {
                LifecycleClass::RecentlyEnded
            } else if ended_ago <= thresholds.old_ended_window {
                LifecycleClass::OldEnded { ancient: false }
            } else {
                LifecycleClass::OldEnded { ancient: true }
            }
        }
    }
}

/// Convenience wrapper over [`classify_lifecycle`] for a whole fixture.
pub fn classify_fixture(
    fixture: &Fixture,
    now: DateTime<Utc>,
    thresholds: &LifecycleThresholds,
) -> LifecycleClass {
    classify_lifecycle(fixture.status_code(), fixture.kickoff(), now, thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn classify(code: &str, kickoff: &str, now: &str) -> LifecycleClass {
        classify_lifecycle(
            &FixtureStatus::from_code(code),
            Ok(at(kickoff)),
            at(now),
            &LifecycleThresholds::default(),
        )
    }

    #[test]
    fn test_in_progress_is_live() {
        for code in ["1H", "HT", "2H", "ET", "BT", "P", "SUSP", "INT", "LIVE"] {
            assert_eq!(
                classify(code, "2025-03-10T18:00:00Z", "2025-03-10T18:30:00Z"),
                LifecycleClass::Live,
                "{code}"
            );
        }
    }

    #[test]
    fn test_not_started_near_and_far() {
        assert_eq!(
            classify("NS", "2025-03-10T19:00:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::UpcomingNear
        );
        assert_eq!(
            classify("NS", "2025-03-11T19:00:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::UpcomingFar
        );
        // Kickoff passed but within the grace window: still near, not suspect
        assert_eq!(
            classify("NS", "2025-03-10T17:00:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::UpcomingNear
        );
    }

    #[test]
    fn test_overdue_not_started_is_suspect_live() {
        assert_eq!(
            classify("NS", "2025-03-10T15:00:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::Live
        );
        assert_eq!(
            classify("TBD", "2025-03-10T15:59:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::Live
        );
        assert!(is_suspect_live(
            &FixtureStatus::NotStarted,
            at("2025-03-10T15:00:00Z"),
            at("2025-03-10T18:00:00Z"),
            &LifecycleThresholds::default()
        ));
        assert!(!is_suspect_live(
            &FixtureStatus::Finished,
            at("2025-03-10T15:00:00Z"),
            at("2025-03-10T18:00:00Z"),
            &LifecycleThresholds::default()
        ));
    }

    #[test]
    fn test_concluded_tiers_by_age() {
        // Kickoff 3h ago: ended ~1.5h ago
        assert_eq!(
            classify("FT", "2025-03-10T15:00:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::RecentlyEnded
        );
        // Kickoff exactly 3.5h ago: ended exactly 2h ago, still recent
        assert_eq!(
            classify("FT", "2025-03-10T14:30:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::RecentlyEnded
        );
        // Kickoff 5h ago
        assert_eq!(
            classify("AET", "2025-03-10T13:00:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::OldEnded { ancient: false }
        );
        // Three days ago
        assert_eq!(
            classify("PEN", "2025-03-07T13:00:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::OldEnded { ancient: true }
        );
    }

    #[test]
    fn test_called_off_future_fixture_is_cacheable_tier() {
        assert_eq!(
            classify("PST", "2025-03-12T18:00:00Z", "2025-03-10T18:00:00Z"),
            LifecycleClass::OldEnded { ancient: false }
        );
    }

    #[test]
    fn test_unknown_status_and_bad_kickoff_are_live() {
        let thresholds = LifecycleThresholds::default();
        assert_eq!(
            classify_lifecycle(
                &FixtureStatus::from_code("DELAYED"),
                Ok(at("2025-03-07T13:00:00Z")),
                at("2025-03-10T18:00:00Z"),
                &thresholds
            ),
            LifecycleClass::Live
        );
        assert_eq!(
            classify_lifecycle(
                &FixtureStatus::Finished,
                Err(AppError::datetime_parse_error("bad")),
                at("2025-03-10T18:00:00Z"),
                &thresholds
            ),
            LifecycleClass::Live
        );
    }

    #[test]
    fn test_custom_thresholds_move_suspect_boundary() {
        let thresholds = LifecycleThresholds {
            suspect_live_after: Duration::minutes(30),
            ..LifecycleThresholds::default()
        };
        assert_eq!(
            classify_lifecycle(
                &FixtureStatus::NotStarted,
                Ok(at("2025-03-10T17:00:00Z")),
                at("2025-03-10T18:00:00Z"),
                &thresholds
            ),
            LifecycleClass::Live
        );
    }
}
