use futures::lock::Mutex;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// One async mutex per `(store_id, user_id)` session, so a scan's
/// read-decide-append sequence never interleaves with another scan of the
/// same session in this process.
pub struct SessionLocks {
    locks: Cache<(u64, u64), Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new(max_sessions: u64, idle: Duration) -> Self {
        Self {
            locks: Cache::builder()
                .max_capacity(max_sessions)
                .time_to_idle(idle)
                .build(),
        }
    }

    pub async fn get(&self, store_id: u64, user_id: u64) -> Arc<Mutex<()>> {
        self.locks
            .get_with((store_id, user_id), async { Arc::new(Mutex::new(())) })
            .await
    }
}
