use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Display name used for a store owner clocking without a staff profile.
pub const STORE_OWNER_NAME: &str = "Store Owner";

/// `user_id` reserved for the store owner when no `store_users` row exists.
pub const OWNER_USER_ID: u64 = 0;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ClockAction {
    ClockIn,
    ClockOut,
}

impl ClockAction {
    /// Past-tense phrase used in scan notifications.
    pub fn past_tense(&self) -> &'static str {
        match self {
            ClockAction::ClockIn => "clocked in",
            ClockAction::ClockOut => "clocked out",
        }
    }
}

/// Last known entry for a `(store_id, user_id)` session.
#[derive(Debug, Clone, PartialEq)]
pub struct LastEntry {
    pub id: u64,
    pub action: ClockAction,
    pub timestamp: DateTime<Utc>,
}

/// Row to be appended by an accepted scan.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub store_id: u64,
    pub user_id: u64,
    pub action: ClockAction,
    pub timestamp: DateTime<Utc>,
}

/// Attendance record joined with the actor's display name.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "store_id": 7,
    "user_id": 3,
    "full_name": "Jane Doe",
    "action": "clock-in",
    "timestamp": "2026-10-16T09:00:00Z"
}))]
pub struct AttendanceLog {
    pub id: u64,
    pub store_id: u64,
    pub user_id: u64,
    pub full_name: String,
    pub action: ClockAction,
    #[schema(format = "date-time", value_type = String)]
    pub timestamp: DateTime<Utc>,
}

/// Raw `attendance` row as read by sqlx; `action` is validated on conversion.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub store_id: u64,
    pub user_id: u64,
    pub full_name: Option<String>,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceLog {
    type Error = strum::ParseError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(AttendanceLog {
            id: row.id,
            store_id: row.store_id,
            user_id: row.user_id,
            full_name: row
                .full_name
                .unwrap_or_else(|| STORE_OWNER_NAME.to_string()),
            action: row.action.parse()?,
            timestamp: row.timestamp,
        })
    }
}
