use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use super::barcode::{self, StoreBarcode};
use super::policy::ClockingPolicy;
use super::session::SessionState;
use crate::error::AppError;
use crate::model::attendance::{
    AttendanceLog, ClockAction, NewAttendance, OWNER_USER_ID, STORE_OWNER_NAME,
};
use crate::model::store_user::StoreUser;
use crate::repository::{Appended, AttendanceStore};
use crate::utils::log_cache::LogCache;
use crate::utils::session_locks::SessionLocks;

const SESSION_LOCK_IDLE: Duration = Duration::from_secs(600);
const MAX_TRACKED_SESSIONS: u64 = 100_000;
const MAX_CACHED_STORES: u64 = 10_000;

pub const DEFAULT_PER_PAGE: u32 = 5;
pub const MAX_PER_PAGE: u32 = 100;

/// Who is scanning.
#[derive(Debug, Clone)]
pub enum Actor {
    /// Store owner with no `store_users` row.
    Owner,
    Staff(StoreUser),
}

impl Actor {
    pub fn user_id(&self) -> u64 {
        match self {
            Actor::Owner => OWNER_USER_ID,
            Actor::Staff(user) => user.id,
        }
    }

    /// Name used when greeting the actor.
    pub fn greeting_name(&self) -> &str {
        match self {
            Actor::Owner => STORE_OWNER_NAME,
            Actor::Staff(user) => user.first_name(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanReceipt {
    pub record: AttendanceLog,
    #[schema(example = "Good morning, Jane! You clocked in at October 16, 2026 09:00.")]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogPage {
    pub data: Vec<AttendanceLog>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 5)]
    pub per_page: u32,
    #[schema(example = 12)]
    pub total: u64,
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    }
}

/// Decides and records clock-in/clock-out events for store sessions.
pub struct AttendanceTracker<S> {
    store: S,
    policy: ClockingPolicy,
    locks: SessionLocks,
    logs: LogCache,
}

impl<S: AttendanceStore> AttendanceTracker<S> {
    pub fn new(store: S, policy: ClockingPolicy, log_ttl: Duration) -> Self {
        Self {
            store,
            policy,
            locks: SessionLocks::new(MAX_TRACKED_SESSIONS, SESSION_LOCK_IDLE),
            logs: LogCache::new(MAX_CACHED_STORES, log_ttl),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn resolve_actor(&self, store_id: u64, user_id: u64) -> Result<Actor, AppError> {
        if user_id == OWNER_USER_ID {
            return Ok(Actor::Owner);
        }

        match self.store.find_staff(user_id, store_id).await {
            Ok(Some(user)) => Ok(Actor::Staff(user)),
            Ok(None) => {
                info!(store_id, user_id, "Scan by unknown staff user");
                Err(AppError::Unauthenticated("User not authenticated.".into()))
            }
            Err(e) => {
                warn!(store_id, user_id, error = %e, "Staff lookup failed");
                Err(AppError::Unauthenticated("User not authenticated.".into()))
            }
        }
    }

    /// Processes one decoded barcode. Every rejection leaves the log untouched.
    #[instrument(name = "attendance_scan", skip(self, scanned))]
    pub async fn scan(
        &self,
        store_id: u64,
        user_id: u64,
        scanned: &str,
        now: DateTime<Utc>,
    ) -> Result<ScanReceipt, AppError> {
        self.policy.check_window(now)?;
        barcode::validate(scanned, store_id, now, &self.policy)?;
        let actor = self.resolve_actor(store_id, user_id).await?;

        let lock = self.locks.get(store_id, user_id).await;
        let _guard = lock.lock().await;

        let last = self.store.latest_entry(store_id, user_id).await?;
        let state = SessionState::from_last(last.as_ref());
        let action = state.next_action(now, &self.policy);
        if action == ClockAction::ClockIn && matches!(state, SessionState::ClockedIn { .. }) {
            info!(store_id, user_id, "Open session past closing time, starting a new one");
        }
        debug!(?state, %action, "Derived attendance action");

        let record = NewAttendance {
            store_id,
            user_id: actor.user_id(),
            action,
            timestamp: now,
        };
        let record = match self.store.append(record, last.map(|e| e.id)).await? {
            Appended::Inserted(record) => record,
            Appended::Stale => return Err(AppError::Conflict),
        };

        self.logs.prepend(record.clone()).await;

        let local = self.policy.local(now);
        let message = format!(
            "{}, {}! You {} at {}.",
            greeting(local.hour()),
            actor.greeting_name(),
            action.past_tense(),
            local.format("%B %-d, %Y %H:%M")
        );
        info!(record_id = record.id, %action, "Attendance recorded");

        Ok(ScanReceipt { record, message })
    }

    pub async fn list(
        &self,
        store_id: u64,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<LogPage, AppError> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);

        let logs = match self.logs.get(store_id).await {
            Some(logs) => logs,
            None => {
                let generation = self.logs.generation(store_id);
                let logs = self.store.list_logs(store_id).await?;
                self.logs.put_if_unchanged(store_id, generation, logs).await
            }
        };

        let offset = (page as usize - 1).saturating_mul(per_page as usize);
        Ok(LogPage {
            data: logs
                .iter()
                .skip(offset)
                .take(per_page as usize)
                .cloned()
                .collect(),
            page,
            per_page,
            total: logs.len() as u64,
        })
    }

    pub async fn delete(&self, store_id: u64, id: u64) -> Result<(), AppError> {
        if !self.store.delete_log(store_id, id).await? {
            return Err(AppError::NotFound("Attendance record not found".into()));
        }
        self.logs.remove(store_id, id).await;
        info!(store_id, id, "Attendance record deleted");
        Ok(())
    }

    pub async fn delete_all(&self, store_id: u64) -> Result<u64, AppError> {
        let deleted = self.store.delete_all_logs(store_id).await?;
        self.logs.clear(store_id).await;
        info!(store_id, deleted, "All attendance records deleted");
        Ok(deleted)
    }

    pub fn barcode(&self, store_id: u64, now: DateTime<Utc>) -> StoreBarcode {
        barcode::barcode_for(store_id, now, &self.policy)
    }
}
