//! Supervised background replication of saves to the cloud.
//!
//! Each dispatched save runs as its own task in a [`JoinSet`]. Failures are
//! logged, published as [`StorageEvent::Error`], and counted; they never
//! reach the caller that triggered the save. [`ReplicationWorker::flush`] is
//! the join point: it waits for every in-flight task and reports how many
//! failed since the previous flush.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;

use crate::events::{EventSink, StorageEvent};
use crate::storage::{DataStorageProvider, SaveRecord};

#[derive(Default)]
pub(crate) struct ReplicationWorker {
    tasks: Mutex<JoinSet<()>>,
    in_flight: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
}

impl ReplicationWorker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start replicating `record` to `remote` without waiting for it.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn dispatch(
        &self,
        remote: Arc<dyn DataStorageProvider>,
        slot_id: String,
        record: SaveRecord,
        events: EventSink<StorageEvent>,
    ) {
        let in_flight = Arc::clone(&self.in_flight);
        let failed = Arc::clone(&self.failed);
        in_flight.fetch_add(1, Ordering::AcqRel);

        let mut tasks = self.lock_tasks();
        // Reap finished tasks so the set does not grow between flushes.
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            match remote.save(&slot_id, record).await {
                Ok(_) => tracing::debug!("Replicated slot {} to {}", slot_id, remote.name()),
                Err(e) => {
                    failed.fetch_add(1, Ordering::AcqRel);
                    tracing::warn!("Cloud replication of slot {} failed: {}", slot_id, e);
                    events.emit(StorageEvent::Error {
                        message: format!("Cloud: {}", e),
                    });
                }
            }
            in_flight.fetch_sub(1, Ordering::AcqRel);
        });
    }

    /// Replications dispatched but not yet finished.
    pub(crate) fn pending(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Wait for all in-flight replications.
    ///
    /// Returns the number of replications that failed since the last flush.
    pub(crate) async fn flush(&self) -> usize {
        let mut tasks = std::mem::take(&mut *self.lock_tasks());

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Replication task aborted: {}", e);
                self.failed.fetch_add(1, Ordering::AcqRel);
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
            }
        }

        self.failed.swap(0, Ordering::AcqRel)
    }

    fn lock_tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
