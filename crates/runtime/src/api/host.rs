//! Generic lifecycle wrapper binding exactly one provider to a service.
//!
//! ```text
//! Uninitialized --initialize (provider bound)--> Initialized --shutdown--> Uninitialized
//! ```
//!
//! The host never dereferences a missing provider: every service operation
//! goes through [`ServiceHost::ready_provider`], which rejects with
//! [`ServiceError::NotInitialized`] outside the `Initialized` state.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};

use super::errors::{Result, ServiceError};
use super::providers::{ServiceKind, ServiceProvider};
use crate::events::{EventSink, LifecycleEvent};

const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Lifecycle state owned by a [`ServiceHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceState {
    #[default]
    Uninitialized,
    Initialized,
}

struct HostInner<P: ?Sized> {
    state: ServiceState,
    provider: Option<Arc<P>>,
}

/// Binds one provider of type `P` and forwards its events of type `E`.
///
/// # Architecture
///
/// ```text
/// ServiceHost
/// ├── inner: state + bound provider (std RwLock, never held across .await)
/// ├── transition: serializes initialize/shutdown (tokio Mutex)
/// ├── events: broadcast channel fed by the provider's EventSink
/// ├── lifecycle: broadcast channel of LifecycleEvent
/// └── generation: invalidates sinks issued to previous bindings
/// ```
pub struct ServiceHost<P: ?Sized, E> {
    kind: ServiceKind,
    inner: RwLock<HostInner<P>>,
    transition: Mutex<()>,
    events: broadcast::Sender<E>,
    lifecycle: broadcast::Sender<LifecycleEvent>,
    generation: Arc<AtomicU64>,
    _event: PhantomData<fn() -> E>,
}

impl<P, E> ServiceHost<P, E>
where
    P: ServiceProvider<E> + ?Sized,
    E: Clone + Send + 'static,
{
    /// Create an unbound host with the default event capacity.
    pub fn new(kind: ServiceKind) -> Self {
        Self::with_capacity(kind, DEFAULT_EVENT_CAPACITY)
    }

    /// Create an unbound host whose event channels buffer `capacity` events.
    pub fn with_capacity(kind: ServiceKind, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            kind,
            inner: RwLock::new(HostInner {
                state: ServiceState::Uninitialized,
                provider: None,
            }),
            transition: Mutex::new(()),
            events: broadcast::channel(capacity).0,
            lifecycle: broadcast::channel(capacity).0,
            generation: Arc::new(AtomicU64::new(0)),
            _event: PhantomData,
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn state(&self) -> ServiceState {
        self.read_inner().state
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == ServiceState::Initialized
    }

    /// Bind `provider`, replacing any previous (uninitialized) binding.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ProviderBound`] while the host is initialized or
    /// an initialize/shutdown is in progress; the current binding is untouched.
    pub fn set_provider(&self, provider: Arc<P>) -> Result<()> {
        let Ok(_transition) = self.transition.try_lock() else {
            tracing::warn!(
                "[{}] Provider change rejected: lifecycle transition in progress",
                self.kind
            );
            return Err(ServiceError::ProviderBound { service: self.kind });
        };

        let mut inner = self.write_inner();
        if inner.state == ServiceState::Initialized {
            tracing::warn!(
                "[{}] Attempting to set provider while service is initialized. Shutdown first.",
                self.kind
            );
            return Err(ServiceError::ProviderBound { service: self.kind });
        }

        tracing::debug!("[{}] Provider bound: {}", self.kind, provider.name());
        inner.provider = Some(provider);
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Currently bound provider, regardless of lifecycle state.
    pub fn provider(&self) -> Option<Arc<P>> {
        self.read_inner().provider.clone()
    }

    /// Bound provider, only while the host is initialized.
    pub fn ready_provider(&self) -> Result<Arc<P>> {
        let inner = self.read_inner();
        match (&inner.state, &inner.provider) {
            (ServiceState::Initialized, Some(provider)) => Ok(Arc::clone(provider)),
            _ => Err(ServiceError::NotInitialized { service: self.kind }),
        }
    }

    /// Initialize the bound provider and transition to `Initialized`.
    ///
    /// Already-initialized hosts return `Ok(())` without touching the provider.
    /// A provider failure leaves the host `Uninitialized` and is returned.
    pub async fn initialize(&self) -> Result<()> {
        let _transition = self.transition.lock().await;

        let provider = {
            let inner = self.read_inner();
            if inner.state == ServiceState::Initialized {
                tracing::warn!("[{}] Service already initialized.", self.kind);
                return Ok(());
            }
            inner
                .provider
                .clone()
                .ok_or(ServiceError::ProviderNotSet { service: self.kind })?
        };

        let issued_at = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let sink = EventSink::new(self.events.clone(), Arc::clone(&self.generation), issued_at);

        if let Err(e) = provider.initialize(sink).await {
            self.generation.fetch_add(1, Ordering::AcqRel);
            tracing::error!(
                "[{}] Failed to initialize provider {}: {}",
                self.kind,
                provider.name(),
                e
            );
            return Err(e);
        }

        self.write_inner().state = ServiceState::Initialized;
        self.publish_lifecycle(true);
        tracing::info!(
            "[{}] Initialized successfully with provider: {}",
            self.kind,
            provider.name()
        );
        Ok(())
    }

    /// Shut the provider down and transition to `Uninitialized`.
    ///
    /// Idempotent: does nothing when already uninitialized.
    pub async fn shutdown(&self) {
        let _transition = self.transition.lock().await;

        let provider = {
            let inner = self.read_inner();
            if inner.state != ServiceState::Initialized {
                return;
            }
            inner.provider.clone()
        };

        if let Some(provider) = provider {
            provider.shutdown().await;
        }

        self.generation.fetch_add(1, Ordering::AcqRel);
        self.write_inner().state = ServiceState::Uninitialized;
        self.publish_lifecycle(false);
        tracing::info!("[{}] Shutdown complete.", self.kind);
    }

    /// Subscribe to provider events forwarded by this host.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.events.subscribe()
    }

    /// Subscribe to initialization-changed events.
    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.lifecycle.subscribe()
    }

    fn publish_lifecycle(&self, initialized: bool) {
        let event = LifecycleEvent {
            kind: self.kind,
            initialized,
        };
        if self.lifecycle.send(event).is_err() {
            tracing::trace!("[{}] No lifecycle subscribers", self.kind);
        }
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, HostInner<P>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, HostInner<P>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    struct FakeProvider {
        name: &'static str,
        succeed: bool,
        initialized: AtomicBool,
        shutdowns: AtomicU64,
        sink: std::sync::Mutex<EventSink<u32>>,
    }

    impl FakeProvider {
        fn new(name: &'static str, succeed: bool) -> Self {
            Self {
                name,
                succeed,
                initialized: AtomicBool::new(false),
                shutdowns: AtomicU64::new(0),
                sink: std::sync::Mutex::new(EventSink::detached()),
            }
        }

        fn emit(&self, value: u32) -> bool {
            self.sink.lock().unwrap().emit(value)
        }
    }

    #[async_trait]
    impl ServiceProvider<u32> for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn initialize(&self, events: EventSink<u32>) -> Result<()> {
            if !self.succeed {
                return Err(ServiceError::ProviderInit {
                    provider: self.name.to_string(),
                    reason: "offline".to_string(),
                });
            }
            *self.sink.lock().unwrap() = events;
            self.initialized.store(true, Ordering::Release);
            Ok(())
        }

        async fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::AcqRel);
            self.initialized.store(false, Ordering::Release);
        }

        fn is_initialized(&self) -> bool {
            self.initialized.load(Ordering::Acquire)
        }
    }

    type Host = ServiceHost<FakeProvider, u32>;

    #[tokio::test]
    async fn test_initialize_without_provider_fails() {
        let host = Host::new(ServiceKind::Stats);
        let err = host.initialize().await.unwrap_err();
        assert!(matches!(err, ServiceError::ProviderNotSet { .. }));
        assert_eq!(host.state(), ServiceState::Uninitialized);
    }

    #[tokio::test]
    async fn test_initialize_and_shutdown_raise_lifecycle_events() {
        let host = Host::new(ServiceKind::Stats);
        let mut lifecycle = host.subscribe_lifecycle();
        host.set_provider(Arc::new(FakeProvider::new("fake", true)))
            .unwrap();

        host.initialize().await.unwrap();
        assert!(host.is_initialized());
        assert!(lifecycle.recv().await.unwrap().initialized);

        host.shutdown().await;
        assert!(!host.is_initialized());
        assert!(!lifecycle.recv().await.unwrap().initialized);
    }

    #[tokio::test]
    async fn test_failed_provider_init_keeps_uninitialized() {
        let host = Host::new(ServiceKind::Stats);
        host.set_provider(Arc::new(FakeProvider::new("broken", false)))
            .unwrap();

        let err = host.initialize().await.unwrap_err();
        assert!(matches!(err, ServiceError::ProviderInit { .. }));
        assert_eq!(host.state(), ServiceState::Uninitialized);
        assert!(host.ready_provider().is_err());
    }

    #[tokio::test]
    async fn test_set_provider_rejected_while_initialized() {
        let host = Host::new(ServiceKind::Stats);
        host.set_provider(Arc::new(FakeProvider::new("first", true)))
            .unwrap();
        host.initialize().await.unwrap();

        let err = host
            .set_provider(Arc::new(FakeProvider::new("second", true)))
            .unwrap_err();
        assert!(matches!(err, ServiceError::ProviderBound { .. }));
        assert_eq!(host.provider().unwrap().name(), "first");
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let host = Host::new(ServiceKind::Stats);
        let provider = Arc::new(FakeProvider::new("fake", true));
        host.set_provider(Arc::clone(&provider)).unwrap();

        host.shutdown().await;
        assert_eq!(provider.shutdowns.load(Ordering::Acquire), 0);

        host.initialize().await.unwrap();
        host.shutdown().await;
        host.shutdown().await;
        assert_eq!(provider.shutdowns.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn test_events_forwarded_until_shutdown() {
        let host = Host::new(ServiceKind::Stats);
        let provider = Arc::new(FakeProvider::new("fake", true));
        host.set_provider(Arc::clone(&provider)).unwrap();
        let mut events = host.subscribe();

        host.initialize().await.unwrap();
        assert!(provider.emit(1));
        assert_eq!(events.recv().await.unwrap(), 1);

        host.shutdown().await;
        assert!(!provider.emit(2), "stale provider must not publish");
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ready_provider_requires_initialized() {
        let host = Host::new(ServiceKind::Stats);
        host.set_provider(Arc::new(FakeProvider::new("fake", true)))
            .unwrap();

        assert!(matches!(
            host.ready_provider(),
            Err(ServiceError::NotInitialized { .. })
        ));
        host.initialize().await.unwrap();
        assert!(host.ready_provider().is_ok());
    }
}
