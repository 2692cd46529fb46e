//! Last-observed status per fixture and transition classification

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::constants::store;
use crate::data_fetcher::models::{FixtureId, FixtureStatus, Phase};
use crate::data_fetcher::processors::lifecycle::seconds;

/// Kind of status change between two observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// not-started to in-progress
    Started,
    /// in-progress to concluded
    Finished,
    /// in-progress to a different in-progress code
    PhaseChange,
    /// Skipped phases, regressions and unrecognized codes
    Irregular,
}

impl TransitionKind {
    pub fn between(from: &FixtureStatus, to: &FixtureStatus) -> Self {
        match (from.phase(), to.phase()) {
            (Some(Phase::NotStarted), Some(Phase::InProgress)) => Self::Started,
            (Some(Phase::InProgress), Some(Phase::Concluded)) => Self::Finished,
            (Some(Phase::InProgress), Some(Phase::InProgress)) => Self::PhaseChange,
            _ => Self::Irregular,
        }
    }

    /// Whether list entries containing the fixture must go as well
    pub fn invalidates_lists(&self) -> bool {
        !matches!(self, Self::PhaseChange)
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Started => "started",
            Self::Finished => "finished",
            Self::PhaseChange => "phase change",
            Self::Irregular => "irregular",
        };
        f.write_str(label)
    }
}

/// A detected change of status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub fixture_id: FixtureId,
    pub from: FixtureStatus,
    pub to: FixtureStatus,
    pub kind: TransitionKind,
    pub observed_at: DateTime<Utc>,
}

/// Last observation of one fixture. `from` is the status before the most
/// recent change, if one was ever seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub fixture_id: FixtureId,
    pub from: Option<FixtureStatus>,
    pub to: FixtureStatus,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TransitionTracker {
    records: HashMap<FixtureId, TransitionRecord>,
    retention: Duration,
}

impl Default for TransitionTracker {
    fn default() -> Self {
        Self::new(seconds(store::TRANSITION_RETENTION_SECONDS))
    }
}

impl TransitionTracker {
    pub fn new(retention: Duration) -> Self {
        Self {
            records: HashMap::new(),
            retention,
        }
    }

    /// Records `status` for `fixture_id` and reports a transition if it differs
    /// from the previous status. Without a record, `fallback_previous` (the
    /// status of a cached copy) stands in for the previous observation.
    pub fn observe(
        &mut self,
        fixture_id: FixtureId,
        status: &FixtureStatus,
        fallback_previous: Option<FixtureStatus>,
        now: DateTime<Utc>,
    ) -> Option<StatusTransition> {
        let previous = self
            .records
            .get(&fixture_id)
            .map(|record| record.to.clone())
            .or(fallback_previous);

        let transition = match previous {
            Some(previous) if previous != *status => {
                let kind = TransitionKind::between(&previous, status);
                if kind == TransitionKind::Irregular {
                    warn!(
                        "Irregular status transition for fixture {}: {} -> {}",
                        fixture_id, previous, status
                    );
                } else {
                    debug!(
                        "Fixture {} {}: {} -> {}",
                        fixture_id, kind, previous, status
                    );
                }
                Some(StatusTransition {
                    fixture_id,
                    from: previous,
                    to: status.clone(),
                    kind,
                    observed_at: now,
                })
            }
            _ => None,
        };

        match self.records.get_mut(&fixture_id) {
            Some(record) => {
                if let Some(transition) = &transition {
                    record.from = Some(transition.from.clone());
                    record.to = transition.to.clone();
                }
                record.observed_at = now;
            }
            None => {
                self.records.insert(
                    fixture_id,
                    TransitionRecord {
                        fixture_id,
                        from: transition.as_ref().map(|t| t.from.clone()),
                        to: status.clone(),
                        observed_at: now,
                    },
                );
            }
        }

        transition
    }

    /// Drops records not observed within the retention window
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        let retention = self.retention;
        self.records
            .retain(|_, record| now.signed_duration_since(record.observed_at) <= retention);
        let pruned = before - self.records.len();
        if pruned > 0 {
            debug!("Pruned {} idle transition records", pruned);
        }
        pruned
    }

    pub fn record(&self, fixture_id: FixtureId) -> Option<&TransitionRecord> {
        self.records.get(&fixture_id)
    }

    pub fn contains(&self, fixture_id: FixtureId) -> bool {
        self.records.contains_key(&fixture_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
