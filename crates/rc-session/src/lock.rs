//! Per-call single-flight guard (spec §4.7, §5: "at most one turn runs
//! per call session at a time").
//!
//! Ported near-verbatim from the teacher's per-session run lock: each
//! session key maps to a `Semaphore(1)`; a second trigger arriving while a
//! turn is in flight either waits for the one queued slot or is told the
//! session is busy.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Try to acquire the run lock without waiting — used to decide
    /// whether a newly-fired debounce trigger should be dropped because a
    /// turn for this call is already in flight (spec §4.7 single-flight).
    pub fn try_acquire(&self, call_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let sem = self.sem_for(call_id);
        sem.try_acquire_owned().map_err(|_| SessionBusy)
    }

    /// Acquire the run lock, waiting for the current turn to finish if
    /// one is in flight.
    pub async fn acquire(&self, call_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let sem = self.sem_for(call_id);
        sem.acquire_owned().await.map_err(|_| SessionBusy)
    }

    fn sem_for(&self, call_id: &str) -> Arc<Semaphore> {
        let mut locks = self.locks.lock();
        locks
            .entry(call_id.to_owned())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop locks for calls that have ended (cleanup, called periodically
    /// by the call registry).
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }

    /// Remove the lock entry for a call that has fully ended.
    pub fn remove(&self, call_id: &str) {
        self.locks.lock().remove(call_id);
    }
}

#[derive(Debug)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call session is busy — a turn is already in progress")
    }
}

impl std::error::Error for SessionBusy {}
