use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::status::FixtureStatus;
use crate::clock::ViewerZone;
use crate::error::AppError;

pub type FixtureId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    #[serde(rename = "short")]
    pub code: FixtureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_minutes: Option<u32>,
}

impl StatusInfo {
    pub fn new(code: FixtureStatus) -> Self {
        Self {
            code,
            elapsed_minutes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Team {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct League {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<i32>,
}

/// One scheduled match as reported by upstream.
///
/// Only `id`, `scheduled_at` and `status` are interpreted by the cache; teams,
/// league and score are stored and handed back untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub id: FixtureId,
    /// RFC 3339 kickoff timestamp, parsed on demand
    pub scheduled_at: String,
    pub status: StatusInfo,
    pub home_team: Team,
    pub away_team: Team,
    #[serde(default)]
    pub league: League,
    #[serde(default)]
    pub score_home: Option<i32>,
    #[serde(default)]
    pub score_away: Option<i32>,
}

impl Fixture {
    /// Parses the kickoff timestamp as UTC.
    pub fn kickoff(&self) -> Result<DateTime<Utc>, AppError> {
        DateTime::parse_from_rfc3339(&self.scheduled_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                AppError::datetime_parse_error(format!(
                    "Failed to parse kickoff '{}' of fixture {}: {e}",
                    self.scheduled_at, self.id
                ))
            })
    }

    /// Calendar date of the kickoff as seen from the viewer's timezone.
    pub fn local_date(&self, zone: &ViewerZone) -> Result<NaiveDate, AppError> {
        Ok(zone.local_date_of(self.kickoff()?))
    }

    pub fn status_code(&self) -> &FixtureStatus {
        &self.status.code
    }
}
