use chrono::{DateTime, Utc};

use super::policy::ClockingPolicy;
use crate::model::attendance::{ClockAction, LastEntry};

/// Derived state of one `(store_id, user_id)` session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotClockedIn,
    ClockedIn { since: DateTime<Utc> },
}

impl SessionState {
    pub fn from_last(last: Option<&LastEntry>) -> Self {
        match last {
            Some(entry) if entry.action == ClockAction::ClockIn => SessionState::ClockedIn {
                since: entry.timestamp,
            },
            _ => SessionState::NotClockedIn,
        }
    }

    /// Action the next accepted scan records.
    ///
    /// A session still open at or after closing time of the day it was opened
    /// is treated as a missed clock-out: the scan opens a fresh session instead
    /// of closing the stale one.
    pub fn next_action(&self, now: DateTime<Utc>, policy: &ClockingPolicy) -> ClockAction {
        match *self {
            SessionState::NotClockedIn => ClockAction::ClockIn,
            SessionState::ClockedIn { since } => match policy.closing_time_of_day(since) {
                Some(closing) if now >= closing => ClockAction::ClockIn,
                _ => ClockAction::ClockOut,
            },
        }
    }
}
