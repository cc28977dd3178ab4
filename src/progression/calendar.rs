//! Calendar-day and calendar-month math in a single fixed UTC offset
//!
//! Sign-in days and monthly consumption windows are both defined in one
//! reference zone taken from configuration, never the host's local zone.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};

/// Stored `last_sign_date` for users who never signed in.
pub const NEVER_SIGNED: NaiveDate = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

/// `[start_ms, end_ms)` bounds of a calendar month, as Unix milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Fixed reference zone for day and month boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar day of `now` in the reference zone
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Window from the first instant of `now`'s month to the first instant of the next month
    pub fn month_window(&self, now: DateTime<Utc>) -> MonthWindow {
        let local = now.with_timezone(&self.offset);
        let first = NaiveDate::from_ymd_opt(local.year(), local.month(), 1).unwrap_or(NEVER_SIGNED);
        let next = if local.month() == 12 {
            NaiveDate::from_ymd_opt(local.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(local.year(), local.month() + 1, 1)
        }
        .unwrap_or(first + Duration::days(31));

        MonthWindow {
            start_ms: self.start_of_day_ms(first),
            end_ms: self.start_of_day_ms(next),
        }
    }

    fn start_of_day_ms(&self, day: NaiveDate) -> i64 {
        let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
        // A fixed offset has no gaps or folds, so the local midnight is always unique.
        (midnight - self.offset).and_utc().timestamp_millis()
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

/// Format a day as `YYYY-MM-DD` (the stored form of `last_sign_date`)
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parse a stored `YYYY-MM-DD` day
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
