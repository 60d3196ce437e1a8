use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::channel::oneshot;

use super::{Appended, AttendanceStore, IdentityStore};
use crate::error::AppError;
use crate::model::attendance::{AttendanceLog, LastEntry, NewAttendance, STORE_OWNER_NAME};
use crate::model::store::Store;
use crate::model::store_user::StoreUser;

/// In-process store with failure injection for tracker and handler tests.
#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    logs: Mutex<Vec<AttendanceLog>>,
    staff: Mutex<Vec<StoreUser>>,
    stores: Mutex<Vec<Store>>,
    /// Refresh token ids and whether they are still live.
    refresh_tokens: Mutex<Vec<(String, bool)>>,
    pub fail_lookups: AtomicBool,
    pub fail_staff_lookup: AtomicBool,
    pub fail_appends: AtomicBool,
    /// Written just before the next append checks its precondition.
    pub concurrent_write: Mutex<Option<NewAttendance>>,
    /// When set, `list_logs` takes its snapshot and then waits for it.
    pub hold_list: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MemoryStore {
    pub fn with_staff(staff: Vec<StoreUser>) -> Self {
        let store = Self::default();
        *store.staff.lock().unwrap() = staff;
        store
    }

    pub fn with_stores(self, stores: Vec<Store>) -> Self {
        *self.stores.lock().unwrap() = stores;
        self
    }

    pub fn live_refresh_tokens(&self) -> usize {
        self.refresh_tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, live)| *live)
            .count()
    }

    pub fn records(&self) -> Vec<AttendanceLog> {
        self.logs.lock().unwrap().clone()
    }

    /// Inserts unconditionally, as a pre-existing row.
    pub fn seed(&self, record: NewAttendance) -> AttendanceLog {
        let log = self.to_log(record);
        self.logs.lock().unwrap().push(log.clone());
        log
    }

    fn to_log(&self, record: NewAttendance) -> AttendanceLog {
        let full_name = self
            .staff
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == record.user_id && s.store_id == record.store_id)
            .map(|s| s.full_name.clone())
            .unwrap_or_else(|| STORE_OWNER_NAME.to_string());
        AttendanceLog {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            store_id: record.store_id,
            user_id: record.user_id,
            full_name,
            action: record.action,
            timestamp: record.timestamp,
        }
    }

    fn latest(&self, store_id: u64, user_id: u64) -> Option<LastEntry> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.store_id == store_id && l.user_id == user_id)
            .max_by_key(|l| (l.timestamp, l.id))
            .map(|l| LastEntry {
                id: l.id,
                action: l.action,
                timestamp: l.timestamp,
            })
    }

    fn injected(flag: &AtomicBool) -> Result<(), AppError> {
        if flag.load(Ordering::SeqCst) {
            Err(AppError::Storage("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

impl AttendanceStore for MemoryStore {
    async fn latest_entry(
        &self,
        store_id: u64,
        user_id: u64,
    ) -> Result<Option<LastEntry>, AppError> {
        Self::injected(&self.fail_lookups)?;
        Ok(self.latest(store_id, user_id))
    }

    async fn find_staff(&self, user_id: u64, store_id: u64) -> Result<Option<StoreUser>, AppError> {
        Self::injected(&self.fail_staff_lookup)?;
        Ok(self
            .staff
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == user_id && s.store_id == store_id)
            .cloned())
    }

    async fn append(
        &self,
        record: NewAttendance,
        after: Option<u64>,
    ) -> Result<Appended, AppError> {
        Self::injected(&self.fail_appends)?;
        if let Some(other) = self.concurrent_write.lock().unwrap().take() {
            self.seed(other);
        }
        if self.latest(record.store_id, record.user_id).map(|e| e.id) != after {
            return Ok(Appended::Stale);
        }
        Ok(Appended::Inserted(self.seed(record)))
    }

    async fn list_logs(&self, store_id: u64) -> Result<Vec<AttendanceLog>, AppError> {
        Self::injected(&self.fail_lookups)?;
        let mut logs: Vec<_> = self
            .records()
            .into_iter()
            .filter(|l| l.store_id == store_id)
            .collect();
        logs.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));

        let hold = self.hold_list.lock().unwrap().take();
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        Ok(logs)
    }

    async fn delete_log(&self, store_id: u64, id: u64) -> Result<bool, AppError> {
        let mut logs = self.logs.lock().unwrap();
        let before = logs.len();
        logs.retain(|l| !(l.id == id && l.store_id == store_id));
        Ok(logs.len() != before)
    }

    async fn delete_all_logs(&self, store_id: u64) -> Result<u64, AppError> {
        let mut logs = self.logs.lock().unwrap();
        let before = logs.len();
        logs.retain(|l| l.store_id != store_id);
        Ok((before - logs.len()) as u64)
    }
}

impl IdentityStore for MemoryStore {
    async fn find_store_by_email(&self, email: &str) -> Result<Option<Store>, AppError> {
        Self::injected(&self.fail_lookups)?;
        Ok(self
            .stores
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.email_address == email)
            .cloned())
    }

    async fn find_staff_by_email(
        &self,
        email: &str,
        store_id: Option<u64>,
    ) -> Result<Option<StoreUser>, AppError> {
        Self::injected(&self.fail_lookups)?;
        Ok(self
            .staff
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.email_address == email)
            .filter(|s| store_id.is_none_or(|id| s.store_id == id))
            .min_by_key(|s| s.id)
            .cloned())
    }

    async fn store_refresh_token(
        &self,
        _email: &str,
        jti: &str,
        _expires_at: i64,
    ) -> Result<(), AppError> {
        self.refresh_tokens
            .lock()
            .unwrap()
            .push((jti.to_string(), true));
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, AppError> {
        let mut tokens = self.refresh_tokens.lock().unwrap();
        match tokens.iter_mut().find(|(id, live)| id == jti && *live) {
            Some((_, live)) => {
                *live = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
