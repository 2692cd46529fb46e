//! Time sources for the cache and the classifiers.
//!
//! Every freshness and date decision goes through a [`TimeContext`] so that
//! tests can pin "now" and the viewer's timezone.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};
use chrono_tz::Tz;
use std::fmt;

use crate::error::AppError;

/// The timezone fixture dates are shown in.
///
/// `Local` and `Named` resolve the offset at each instant, so kickoffs on
/// either side of a daylight saving change land on their own local date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerZone {
    /// Host timezone
    Local,
    /// IANA timezone such as `Europe/Helsinki`
    Named(Tz),
    Fixed(FixedOffset),
}

impl ViewerZone {
    pub fn parse(name: &str) -> Result<Self, AppError> {
        name.parse::<Tz>()
            .map(Self::Named)
            .map_err(|e| AppError::config_error(format!("Unknown timezone '{name}': {e}")))
    }

    /// UTC offset in effect at `instant`
    pub fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        match self {
            Self::Local => instant.with_timezone(&Local).offset().fix(),
            Self::Named(tz) => instant.with_timezone(tz).offset().fix(),
            Self::Fixed(offset) => *offset,
        }
    }

    pub fn local_date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset_at(instant)).date_naive()
    }
}

impl From<FixedOffset> for ViewerZone {
    fn from(offset: FixedOffset) -> Self {
        Self::Fixed(offset)
    }
}

impl From<Tz> for ViewerZone {
    fn from(tz: Tz) -> Self {
        Self::Named(tz)
    }
}

/// A snapshot of the current instant together with the viewer's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeContext {
    pub now: DateTime<Utc>,
    pub zone: ViewerZone,
}

impl TimeContext {
    pub fn new(now: DateTime<Utc>, zone: impl Into<ViewerZone>) -> Self {
        Self {
            now,
            zone: zone.into(),
        }
    }

    /// Context pinned to UTC, convenient for server-side use and tests
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }

    /// The viewer's calendar date at `now`
    pub fn today(&self) -> NaiveDate {
        self.local_date_of(self.now)
    }

    /// The viewer's calendar date at `instant`, using the offset in effect
    /// at that instant rather than at `now`
    pub fn local_date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.zone.local_date_of(instant)
    }
}

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;

    fn zone(&self) -> ViewerZone;

    fn context(&self) -> TimeContext {
        TimeContext::new(self.now(), self.zone())
    }
}

/// Wall clock, in the host's timezone unless told otherwise
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    zone: ViewerZone,
}

impl SystemClock {
    pub fn in_zone(zone: ViewerZone) -> Self {
        Self { zone }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::in_zone(ViewerZone::Local)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn zone(&self) -> ViewerZone {
        self.zone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_today_uses_viewer_offset() {
        let now = at("2025-03-10T23:30:00Z");
        let helsinki = TimeContext::new(now, FixedOffset::east_opt(2 * 3600).unwrap());
        let utc = TimeContext::utc(now);

        assert_eq!(helsinki.today(), day("2025-03-11"));
        assert_eq!(utc.today(), day("2025-03-10"));
    }

    #[test]
    fn test_named_zone_uses_offset_at_the_instant() {
        // Helsinki moves from +2 to +3 on 2025-03-30
        let ctx = TimeContext::new(at("2025-03-31T12:00:00Z"), chrono_tz::Europe::Helsinki);
        assert_eq!(ctx.today(), day("2025-03-31"));

        // 23:30 local on the 29th, still at +2
        assert_eq!(ctx.local_date_of(at("2025-03-29T21:30:00Z")), day("2025-03-29"));
        // 00:30 local on the 31st, after the change
        assert_eq!(ctx.local_date_of(at("2025-03-30T21:30:00Z")), day("2025-03-31"));

        // A fixed offset taken at "now" would move the first one a day forward
        let pinned = TimeContext::new(ctx.now, FixedOffset::east_opt(3 * 3600).unwrap());
        assert_eq!(pinned.local_date_of(at("2025-03-29T21:30:00Z")), day("2025-03-30"));
    }

    #[test]
    fn test_parse_zone_name() {
        assert_eq!(
            ViewerZone::parse("Europe/Helsinki").unwrap(),
            ViewerZone::Named(chrono_tz::Europe::Helsinki)
        );
        let err = ViewerZone::parse("Mars/Olympus").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_system_clock_context_is_consistent() {
        let ctx = SystemClock::default().context();
        assert_eq!(ctx.zone, ViewerZone::Local);
        let offset = ctx.zone.offset_at(ctx.now);
        assert_eq!(ctx.today(), ctx.now.with_timezone(&offset).date_naive());
    }
}
