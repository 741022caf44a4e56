//! Service context holding one service instance per [`ServiceKind`].
//!
//! The [`ServiceContext`] is created at application start, passed to whoever
//! needs service access, and torn down with [`ServiceContext::shutdown_all`].
//! There is no process-wide registry; tests simply build their own context.
//!
//! # Design
//!
//! - **Erased lifecycle**: every entry is reachable as `Arc<dyn Service>` for
//!   bulk initialize/shutdown
//! - **Typed lookup**: [`ServiceContext::get`] downcasts to the concrete
//!   service type registered under [`ServiceType::KIND`]
//! - **Deterministic order**: initialization follows [`ServiceKind`] order,
//!   shutdown runs in reverse

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::{Result, ServiceError, ServiceKind, ServiceState};

/// Lifecycle surface shared by every service façade.
#[async_trait]
pub trait Service: Send + Sync {
    fn kind(&self) -> ServiceKind;

    fn state(&self) -> ServiceState;

    async fn initialize(&self) -> Result<()>;

    async fn shutdown(&self);
}

/// A concrete service type with a statically known kind.
pub trait ServiceType: Service + Sized + 'static {
    const KIND: ServiceKind;
}

struct Entry {
    service: Arc<dyn Service>,
    typed: Arc<dyn Any + Send + Sync>,
}

/// Registry of live services keyed by kind.
///
/// # Architecture
///
/// ```text
/// ServiceContext
/// └── services: BTreeMap<ServiceKind, Entry>
///       ├── service: Arc<dyn Service>          (lifecycle)
///       └── typed: Arc<dyn Any + Send + Sync>  (typed lookup)
/// ```
#[derive(Default)]
pub struct ServiceContext {
    services: RwLock<BTreeMap<ServiceKind, Entry>>,
}

impl ServiceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under [`ServiceType::KIND`].
    ///
    /// Returns the previously registered service of the same kind, if any.
    /// The replaced service is not shut down; that is the caller's decision.
    pub fn register<S: ServiceType>(&self, service: Arc<S>) -> Option<Arc<dyn Service>> {
        let entry = Entry {
            service: Arc::clone(&service) as Arc<dyn Service>,
            typed: service as Arc<dyn Any + Send + Sync>,
        };

        let previous = self
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(S::KIND, entry);

        if previous.is_some() {
            tracing::warn!("[{}] Replacing registered service instance", S::KIND);
        } else {
            tracing::debug!("[{}] Service registered", S::KIND);
        }
        previous.map(|entry| entry.service)
    }

    /// Look up the service registered as `S`.
    pub fn get<S: ServiceType>(&self) -> Option<Arc<S>> {
        let typed = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&S::KIND)
            .map(|entry| Arc::clone(&entry.typed))?;
        typed.downcast::<S>().ok()
    }

    /// Look up the service registered as `S`, failing with `NotInitialized`
    /// when it is missing or not yet initialized.
    pub fn require<S: ServiceType>(&self) -> Result<Arc<S>> {
        match self.get::<S>() {
            Some(service) if service.state() == ServiceState::Initialized => Ok(service),
            _ => Err(ServiceError::NotInitialized { service: S::KIND }),
        }
    }

    /// Type-erased lookup by kind.
    pub fn get_dyn(&self, kind: ServiceKind) -> Option<Arc<dyn Service>> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(|entry| Arc::clone(&entry.service))
    }

    pub fn contains(&self, kind: ServiceKind) -> bool {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    /// Remove the service registered under `kind` without shutting it down.
    pub fn unregister(&self, kind: ServiceKind) -> Option<Arc<dyn Service>> {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind)
            .map(|entry| entry.service)
    }

    /// Registered kinds in initialization order.
    pub fn kinds(&self) -> Vec<ServiceKind> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initialize every registered service.
    ///
    /// A failing service does not stop the others; failures are returned.
    pub async fn initialize_all(&self) -> Vec<(ServiceKind, ServiceError)> {
        let mut failures = Vec::new();
        for (kind, service) in self.snapshot() {
            if let Err(e) = service.initialize().await {
                tracing::error!("[{}] Initialization failed: {}", kind, e);
                failures.push((kind, e));
            }
        }
        failures
    }

    /// Shut down every registered service in reverse kind order, then clear
    /// the context.
    pub async fn shutdown_all(&self) {
        let drained: Vec<_> = {
            let mut services = self
                .services
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *services)
                .into_iter()
                .map(|(kind, entry)| (kind, entry.service))
                .collect()
        };

        for (kind, service) in drained.into_iter().rev() {
            service.shutdown().await;
            tracing::debug!("[{}] Service released", kind);
        }
        tracing::info!("All services shut down");
    }

    fn snapshot(&self) -> Vec<(ServiceKind, Arc<dyn Service>)> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(kind, entry)| (*kind, Arc::clone(&entry.service)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Probe {
        state: Mutex<ServiceState>,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Service for Probe {
        fn kind(&self) -> ServiceKind {
            ServiceKind::Stats
        }

        fn state(&self) -> ServiceState {
            *self.state.lock().unwrap()
        }

        async fn initialize(&self) -> Result<()> {
            if self.fail {
                return Err(ServiceError::ProviderNotSet {
                    service: ServiceKind::Stats,
                });
            }
            *self.state.lock().unwrap() = ServiceState::Initialized;
            self.log.lock().unwrap().push("stats:init");
            Ok(())
        }

        async fn shutdown(&self) {
            *self.state.lock().unwrap() = ServiceState::Uninitialized;
            self.log.lock().unwrap().push("stats:shutdown");
        }
    }

    impl ServiceType for Probe {
        const KIND: ServiceKind = ServiceKind::Stats;
    }

    #[derive(Default)]
    struct OtherProbe {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Service for OtherProbe {
        fn kind(&self) -> ServiceKind {
            ServiceKind::DataStorage
        }

        fn state(&self) -> ServiceState {
            ServiceState::Initialized
        }

        async fn initialize(&self) -> Result<()> {
            self.log.lock().unwrap().push("storage:init");
            Ok(())
        }

        async fn shutdown(&self) {
            self.log.lock().unwrap().push("storage:shutdown");
        }
    }

    impl ServiceType for OtherProbe {
        const KIND: ServiceKind = ServiceKind::DataStorage;
    }

    #[test]
    fn test_register_and_typed_lookup() {
        let ctx = ServiceContext::new();
        assert!(ctx.get::<Probe>().is_none());

        assert!(ctx.register(Arc::new(Probe::default())).is_none());
        assert!(ctx.contains(ServiceKind::Stats));
        assert!(ctx.get::<Probe>().is_some());
        assert!(ctx.get::<OtherProbe>().is_none());

        let replaced = ctx.register(Arc::new(Probe::default()));
        assert!(replaced.is_some());
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_require_checks_state() {
        let ctx = ServiceContext::new();
        ctx.register(Arc::new(Probe::default()));
        let err = ctx.require::<Probe>().err().unwrap();
        assert!(err.is_not_initialized());
    }

    #[tokio::test]
    async fn test_initialize_all_reports_failures() {
        let ctx = ServiceContext::new();
        ctx.register(Arc::new(Probe {
            fail: true,
            ..Probe::default()
        }));
        ctx.register(Arc::new(OtherProbe::default()));

        let failures = ctx.initialize_all().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, ServiceKind::Stats);
    }

    #[tokio::test]
    async fn test_shutdown_all_runs_in_reverse_and_clears() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ctx = ServiceContext::new();
        ctx.register(Arc::new(Probe {
            log: Arc::clone(&log),
            ..Probe::default()
        }));
        ctx.register(Arc::new(OtherProbe {
            log: Arc::clone(&log),
        }));

        assert!(ctx.initialize_all().await.is_empty());
        assert!(ctx.require::<Probe>().is_ok());

        ctx.shutdown_all().await;
        assert!(ctx.is_empty());
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "storage:init",
                "stats:init",
                "stats:shutdown",
                "storage:shutdown"
            ]
        );
    }

    #[test]
    fn test_unregister() {
        let ctx = ServiceContext::new();
        ctx.register(Arc::new(Probe::default()));
        assert!(ctx.unregister(ServiceKind::Stats).is_some());
        assert!(ctx.unregister(ServiceKind::Stats).is_none());
        assert_eq!(ctx.kinds(), Vec::<ServiceKind>::new());
    }
}
