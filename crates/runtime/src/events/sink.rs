//! Generation-scoped publishing handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

/// Publishing handle given to a provider by its host.
///
/// A sink is live while the host's generation counter still equals the value
/// it was issued with. Shutdown and rebinding advance the counter, so events
/// from stale providers are dropped instead of leaking into the host channel.
pub struct EventSink<E> {
    tx: Option<broadcast::Sender<E>>,
    generation: Arc<AtomicU64>,
    issued_at: u64,
}

impl<E: Clone> EventSink<E> {
    pub(crate) fn new(
        tx: broadcast::Sender<E>,
        generation: Arc<AtomicU64>,
        issued_at: u64,
    ) -> Self {
        Self {
            tx: Some(tx),
            generation,
            issued_at,
        }
    }

    /// A sink connected to nothing; every emit is discarded.
    ///
    /// Composite providers hand this to the providers they wrap and report
    /// outcomes themselves.
    pub fn detached() -> Self {
        Self {
            tx: None,
            generation: Arc::new(AtomicU64::new(0)),
            issued_at: 0,
        }
    }

    /// Whether events emitted now would reach the host channel.
    pub fn is_live(&self) -> bool {
        self.tx.is_some() && self.generation.load(Ordering::Acquire) == self.issued_at
    }

    /// Publish an event. Returns `true` if at least one subscriber received it.
    pub fn emit(&self, event: E) -> bool {
        if !self.is_live() {
            tracing::trace!("Dropping event from stale or detached sink");
            return false;
        }

        match &self.tx {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            generation: Arc::clone(&self.generation),
            issued_at: self.issued_at,
        }
    }
}

impl<E: Clone> Default for EventSink<E> {
    fn default() -> Self {
        Self::detached()
    }
}
