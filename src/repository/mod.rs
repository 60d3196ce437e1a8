//! Persistence seam for attendance data.
//!
//! The tracker only talks to [`AttendanceStore`] and login only to
//! [`IdentityStore`]; production uses the MySQL implementation, tests use the
//! in-memory one.

use crate::error::AppError;
use crate::model::attendance::{AttendanceLog, LastEntry, NewAttendance};
use crate::model::store::Store;
use crate::model::store_user::StoreUser;

pub mod mysql;

#[cfg(test)]
pub mod memory;

/// Result of a conditional append.
#[derive(Debug, Clone)]
pub enum Appended {
    Inserted(AttendanceLog),
    /// The session's latest record changed since the caller read it.
    Stale,
}

#[allow(async_fn_in_trait)]
pub trait AttendanceStore {
    /// Most recent record for the session, newest by timestamp then id.
    async fn latest_entry(&self, store_id: u64, user_id: u64)
    -> Result<Option<LastEntry>, AppError>;

    async fn find_staff(&self, user_id: u64, store_id: u64) -> Result<Option<StoreUser>, AppError>;

    /// Inserts `record` only if the session's latest record id is still
    /// `after` (`None` meaning the session has no records yet).
    async fn append(&self, record: NewAttendance, after: Option<u64>)
    -> Result<Appended, AppError>;

    /// All records of a store, newest first.
    async fn list_logs(&self, store_id: u64) -> Result<Vec<AttendanceLog>, AppError>;

    /// Returns false when no row matched.
    async fn delete_log(&self, store_id: u64, id: u64) -> Result<bool, AppError>;

    async fn delete_all_logs(&self, store_id: u64) -> Result<u64, AppError>;
}

/// Login lookups and refresh-token bookkeeping.
#[allow(async_fn_in_trait)]
pub trait IdentityStore {
    async fn find_store_by_email(&self, email: &str) -> Result<Option<Store>, AppError>;

    /// Staff row by email, optionally restricted to one store.
    async fn find_staff_by_email(
        &self,
        email: &str,
        store_id: Option<u64>,
    ) -> Result<Option<StoreUser>, AppError>;

    async fn store_refresh_token(
        &self,
        email: &str,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), AppError>;

    /// Marks the token revoked. Returns true only if it was live before.
    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, AppError>;
}
