use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The three disjoint lifecycle super-states a recognized status belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    NotStarted,
    InProgress,
    Concluded,
}

/// Upstream short status code.
///
/// Unrecognized codes are kept verbatim in [`FixtureStatus::Unknown`] so that
/// classification can report them instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FixtureStatus {
    ToBeDefined,
    NotStarted,
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    BreakTime,
    Penalties,
    Suspended,
    Interrupted,
    Live,
    Finished,
    FinishedAfterExtraTime,
    FinishedAfterPenalties,
    Postponed,
    Cancelled,
    Abandoned,
    TechnicalLoss,
    WalkOver,
    Unknown(String),
}

impl FixtureStatus {
    /// Parses an upstream short code. Matching is case-insensitive and
    /// ignores surrounding whitespace.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "TBD" => Self::ToBeDefined,
            "NS" => Self::NotStarted,
            "1H" => Self::FirstHalf,
            "HT" => Self::HalfTime,
            "2H" => Self::SecondHalf,
            "ET" => Self::ExtraTime,
            "BT" => Self::BreakTime,
            "P" => Self::Penalties,
            "SUSP" => Self::Suspended,
            "INT" => Self::Interrupted,
            "LIVE" => Self::Live,
            "FT" => Self::Finished,
            "AET" => Self::FinishedAfterExtraTime,
            "PEN" => Self::FinishedAfterPenalties,
            "PST" => Self::Postponed,
            "CANC" => Self::Cancelled,
            "ABD" => Self::Abandoned,
            "AWD" => Self::TechnicalLoss,
            "WO" => Self::WalkOver,
            _ => Self::Unknown(code.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::ToBeDefined => "TBD",
            Self::NotStarted => "NS",
            Self::FirstHalf => "1H",
            Self::HalfTime => "HT",
            Self::SecondHalf => "2H",
            Self::ExtraTime => "ET",
            Self::BreakTime => "BT",
            Self::Penalties => "P",
            Self::Suspended => "SUSP",
            Self::Interrupted => "INT",
            Self::Live => "LIVE",
            Self::Finished => "FT",
            Self::FinishedAfterExtraTime => "AET",
            Self::FinishedAfterPenalties => "PEN",
            Self::Postponed => "PST",
            Self::Cancelled => "CANC",
            Self::Abandoned => "ABD",
            Self::TechnicalLoss => "AWD",
            Self::WalkOver => "WO",
            Self::Unknown(code) => code,
        }
    }

    /// Super-state of this status, `None` for unrecognized codes.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::ToBeDefined | Self::NotStarted => Some(Phase::NotStarted),
            Self::FirstHalf
            | Self::HalfTime
            | Self::SecondHalf
            | Self::ExtraTime
            | Self::BreakTime
            | Self::Penalties
            | Self::Suspended
            | Self::Interrupted
            | Self::Live => Some(Phase::InProgress),
            Self::Finished
            | Self::FinishedAfterExtraTime
            | Self::FinishedAfterPenalties
            | Self::Postponed
            | Self::Cancelled
            | Self::Abandoned
            | Self::TechnicalLoss
            | Self::WalkOver => Some(Phase::Concluded),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_not_started(&self) -> bool {
        self.phase() == Some(Phase::NotStarted)
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase() == Some(Phase::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        self.phase() == Some(Phase::Concluded)
    }

    pub fn is_recognized(&self) -> bool {
        self.phase().is_some()
    }
}

impl fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for FixtureStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for FixtureStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}
