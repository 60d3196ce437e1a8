use moka::future::Cache;
use moka::ops::compute::Op;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::model::attendance::AttendanceLog;

const GENERATION_STRIPES: usize = 64;

/// Newest-first attendance log per store, kept warm between list calls.
///
/// Writers only touch entries that are already cached; a cold store is
/// loaded in full by the next reader. Every write bumps the store's
/// generation, and a loaded snapshot is only cached if no write happened
/// while it was being read.
pub struct LogCache {
    logs: Cache<u64, Arc<Vec<AttendanceLog>>>,
    // striped by store id, counters only ever grow
    generations: Box<[AtomicU64]>,
}

impl LogCache {
    pub fn new(max_stores: u64, ttl: Duration) -> Self {
        Self {
            logs: Cache::builder()
                .max_capacity(max_stores)
                .time_to_live(ttl)
                .build(),
            generations: (0..GENERATION_STRIPES).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn counter(&self, store_id: u64) -> &AtomicU64 {
        &self.generations[(store_id % GENERATION_STRIPES as u64) as usize]
    }

    /// Read before loading a store's log from storage.
    pub fn generation(&self, store_id: u64) -> u64 {
        self.counter(store_id).load(Ordering::SeqCst)
    }

    pub async fn get(&self, store_id: u64) -> Option<Arc<Vec<AttendanceLog>>> {
        self.logs.get(&store_id).await
    }

    /// Caches `logs` unless the store was written since `generation` was read.
    /// The snapshot is returned either way.
    pub async fn put_if_unchanged(
        &self,
        store_id: u64,
        generation: u64,
        logs: Vec<AttendanceLog>,
    ) -> Arc<Vec<AttendanceLog>> {
        let logs = Arc::new(logs);
        let snapshot = logs.clone();
        self.logs
            .entry(store_id)
            .and_compute_with(|_| {
                let op = if self.generation(store_id) == generation {
                    Op::Put(snapshot)
                } else {
                    Op::Nop
                };
                std::future::ready(op)
            })
            .await;
        logs
    }

    pub async fn prepend(&self, log: AttendanceLog) {
        self.update(log.store_id, move |current| {
            let mut logs = Vec::with_capacity(current.len() + 1);
            logs.push(log);
            logs.extend(current.iter().cloned());
            logs
        })
        .await;
    }

    pub async fn remove(&self, store_id: u64, id: u64) {
        self.update(store_id, move |current| {
            current.iter().filter(|l| l.id != id).cloned().collect()
        })
        .await;
    }

    pub async fn clear(&self, store_id: u64) {
        self.logs
            .entry(store_id)
            .and_compute_with(|_| {
                self.counter(store_id).fetch_add(1, Ordering::SeqCst);
                std::future::ready(Op::Put(Arc::new(Vec::new())))
            })
            .await;
    }

    // the bump and the write share the per-key compute with put_if_unchanged
    async fn update<F>(&self, store_id: u64, f: F)
    where
        F: FnOnce(&[AttendanceLog]) -> Vec<AttendanceLog>,
    {
        self.logs
            .entry(store_id)
            .and_compute_with(|entry| {
                self.counter(store_id).fetch_add(1, Ordering::SeqCst);
                let op = match entry {
                    Some(entry) => Op::Put(Arc::new(f(entry.value()))),
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
    }
}
