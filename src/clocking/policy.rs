use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::AppError;

/// Longest barcode grace period the service accepts.
pub const MAX_GRACE_DAYS: u32 = 31;

/// Store-local clocking rules: the daily window, the barcode grace period and
/// the time zone used to turn instants into store calendar days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockingPolicy {
    pub opening_hour: u32,
    pub closing_hour: u32,
    pub grace_days: u32,
    pub timezone: Tz,
}

impl Default for ClockingPolicy {
    fn default() -> Self {
        Self {
            opening_hour: 6,
            closing_hour: 21,
            grace_days: 1,
            timezone: Tz::UTC,
        }
    }
}

impl ClockingPolicy {
    /// Converts an instant into store-local time.
    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.timezone)
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date_naive()
    }

    /// Accepts only `opening_hour <= hour < closing_hour`, store-local.
    pub fn check_window(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        let hour = self.local(now).hour();
        if hour >= self.opening_hour && hour < self.closing_hour {
            Ok(())
        } else {
            Err(AppError::OutsideClockingHours {
                opening_hour: self.opening_hour,
                closing_hour: self.closing_hour,
            })
        }
    }

    /// Closing time on the store-local day `instant` falls on. A closing hour
    /// repeated by a DST fall-back resolves to its first occurrence.
    pub fn closing_time_of_day(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.local_date(instant)
            .and_hms_opt(self.closing_hour, 0, 0)?
            .and_local_timezone(self.timezone)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    }
}
