//! Status-aware assignment of fixtures to calendar date buckets.
//!
//! A fixture belongs to the selected date when its kickoff falls on that date
//! in the viewer's timezone, with one override: a not-started fixture whose
//! kickoff already passed today is withheld, because upstream will flip its
//! status shortly and the caller should look for it under the next day.

use chrono::{Days, NaiveDate};
use std::fmt;
use tracing::{debug, trace};

use crate::clock::TimeContext;
use crate::data_fetcher::models::{Fixture, Phase};

/// Position of the selected date relative to the viewer's today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateBucket {
    Today,
    Yesterday,
    Tomorrow,
    Custom,
}

impl DateBucket {
    pub fn relative_to(selected: NaiveDate, today: NaiveDate) -> Self {
        if selected == today {
            Self::Today
        } else if today.checked_sub_days(Days::new(1)) == Some(selected) {
            Self::Yesterday
        } else if today.checked_add_days(Days::new(1)) == Some(selected) {
            Self::Tomorrow
        } else {
            Self::Custom
        }
    }
}

/// Why a fixture did or did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterReason {
    NotStartedOnDate,
    /// Not started, scheduled today, but kickoff already passed
    KickoffPassed,
    InProgressOnDate,
    ConcludedOnDate,
    DifferentDate,
    UnrecognizedStatus(String),
    UnparseableDate(String),
}

impl FilterReason {
    /// Stable machine-readable code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotStartedOnDate => "not_started_on_date",
            Self::KickoffPassed => "kickoff_passed",
            Self::InProgressOnDate => "in_progress_on_date",
            Self::ConcludedOnDate => "concluded_on_date",
            Self::DifferentDate => "different_date",
            Self::UnrecognizedStatus(_) => "unrecognized_status",
            Self::UnparseableDate(_) => "unparseable_date",
        }
    }

    /// Day offset under which the caller should retry, if any
    pub fn retry_shift_days(&self) -> Option<i64> {
        match self {
            Self::KickoffPassed => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedStatus(code) => write!(f, "{}: {code}", self.code()),
            Self::UnparseableDate(raw) => write!(f, "{}: {raw}", self.code()),
            _ => f.write_str(self.code()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFilterResult {
    pub matches: bool,
    pub reason: FilterReason,
    /// Kickoff date in the viewer's timezone, when the kickoff parsed
    pub local_date: Option<NaiveDate>,
    pub bucket: DateBucket,
}

impl TimeFilterResult {
    fn new(
        matches: bool,
        reason: FilterReason,
        local_date: Option<NaiveDate>,
        bucket: DateBucket,
    ) -> Self {
        Self {
            matches,
            reason,
            local_date,
            bucket,
        }
    }
}

/// Decides whether `fixture` belongs to the `selected` date.
pub fn classify_for_date(
    fixture: &Fixture,
    selected: NaiveDate,
    ctx: &TimeContext,
) -> TimeFilterResult {
    let bucket = DateBucket::relative_to(selected, ctx.today());

    let kickoff = match fixture.kickoff() {
        Ok(kickoff) => kickoff,
        Err(_) => {
            debug!(
                "Fixture {} has unparseable kickoff '{}'",
                fixture.id, fixture.scheduled_at
            );
            return TimeFilterResult::new(
                false,
                FilterReason::UnparseableDate(fixture.scheduled_at.clone()),
                None,
                bucket,
            );
        }
    };
    let local_date = ctx.local_date_of(kickoff);
    let on_date = local_date == selected;

    let Some(phase) = fixture.status_code().phase() else {
        debug!(
            "Fixture {} has unrecognized status '{}'",
            fixture.id,
            fixture.status_code()
        );
        return TimeFilterResult::new(
            false,
            FilterReason::UnrecognizedStatus(fixture.status_code().code().to_string()),
            Some(local_date),
            bucket,
        );
    };

    let result = match (phase, on_date) {
        (_, false) => {
            TimeFilterResult::new(false, FilterReason::DifferentDate, Some(local_date), bucket)
        }
        (Phase::NotStarted, true) if bucket == DateBucket::Today && kickoff <= ctx.now => {
            TimeFilterResult::new(false, FilterReason::KickoffPassed, Some(local_date), bucket)
        }
        (Phase::NotStarted, true) => {
            TimeFilterResult::new(true, FilterReason::NotStartedOnDate, Some(local_date), bucket)
        }
        (Phase::InProgress, true) => {
            TimeFilterResult::new(true, FilterReason::InProgressOnDate, Some(local_date), bucket)
        }
        (Phase::Concluded, true) => {
            TimeFilterResult::new(true, FilterReason::ConcludedOnDate, Some(local_date), bucket)
        }
    };

    trace!(
        "Fixture {} vs {}: matches={}, reason={}, local_date={}",
        fixture.id, selected, result.matches, result.reason, local_date
    );
    result
}

/// Outcome of filtering a whole upstream list for one date.
#[derive(Debug, Clone, Default)]
pub struct FilteredFixtures {
    pub matching: Vec<Fixture>,
    /// Fixtures the caller should look for under an adjacent date
    pub deferred: Vec<Fixture>,
    pub rejected: Vec<(Fixture, FilterReason)>,
}

pub fn partition_for_date(
    fixtures: Vec<Fixture>,
    selected: NaiveDate,
    ctx: &TimeContext,
) -> FilteredFixtures {
    let mut filtered = FilteredFixtures::default();

    for fixture in fixtures {
        let result = classify_for_date(&fixture, selected, ctx);
        if result.matches {
            filtered.matching.push(fixture);
        } else if result.reason.retry_shift_days().is_some() {
            filtered.deferred.push(fixture);
        } else {
            filtered.rejected.push((fixture, result.reason));
        }
    }

    debug!(
        "Filtered fixtures for {}: matching={}, deferred={}, rejected={}",
        selected,
        filtered.matching.len(),
        filtered.deferred.len(),
        filtered.rejected.len()
    );
    filtered
}
