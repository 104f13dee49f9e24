//! Delayed settlement tasks, one per open bet.
//!
//! Each scheduled settlement is a spawned task that sleeps for the
//! resolve delay and then runs its settlement future. Handles are kept
//! by bet id so shutdown can abort whatever is still pending.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Default)]
pub struct SettlementScheduler {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl SettlementScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        // A panic while holding the lock leaves the map itself intact.
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `settle` after `delay`. Rescheduling an id replaces (and
    /// aborts) the earlier task.
    pub fn schedule<F>(&self, bet_id: impl Into<String>, delay: Duration, settle: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let bet_id = bet_id.into();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            settle.await;
        });

        let mut tasks = self.tasks();
        tasks.retain(|_, h| !h.is_finished());
        if let Some(previous) = tasks.insert(bet_id.clone(), handle) {
            previous.abort();
        }
        debug!(bet_id = %bet_id, delay_ms = delay.as_millis() as u64, "Settlement scheduled");
    }

    /// Abort the pending settlement for `bet_id`. Returns false if none
    /// was pending.
    pub fn cancel(&self, bet_id: &str) -> bool {
        match self.tasks().remove(bet_id) {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Abort every pending settlement. Returns how many were aborted.
    pub fn cancel_all(&self) -> usize {
        let mut aborted = 0;
        for (_, handle) in self.tasks().drain() {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            info!(aborted, "Pending settlements cancelled");
        }
        aborted
    }

    /// Settlements that have not run yet.
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks();
        tasks.retain(|_, h| !h.is_finished());
        tasks.len()
    }
}
