//! Account service façade.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{Account, AccountProvider};
use crate::api::{Result, Service, ServiceHost, ServiceKind, ServiceState, ServiceType};
use crate::events::{AccountEvent, LifecycleEvent};

pub struct AccountService {
    host: ServiceHost<dyn AccountProvider, AccountEvent>,
}

impl AccountService {
    pub fn new() -> Self {
        Self {
            host: ServiceHost::new(ServiceKind::Account),
        }
    }

    pub fn with_provider(provider: Arc<dyn AccountProvider>) -> Result<Self> {
        let service = Self::new();
        service.set_provider(provider)?;
        Ok(service)
    }

    pub fn set_provider(&self, provider: Arc<dyn AccountProvider>) -> Result<()> {
        self.host.set_provider(provider)
    }

    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<Account> {
        self.host
            .ready_provider()?
            .create_account(username, password, email)
            .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Account> {
        self.host.ready_provider()?.login(username, password).await
    }

    pub async fn login_as_guest(&self) -> Result<Account> {
        self.host.ready_provider()?.login_as_guest().await
    }

    pub async fn logout(&self) -> Result<()> {
        self.host.ready_provider()?.logout().await
    }

    pub async fn update_account(&self, account: Account) -> Result<()> {
        self.host.ready_provider()?.update_account(account).await
    }

    /// The logged-in account; `None` until the service is initialized.
    pub fn current_account(&self) -> Option<Account> {
        self.host
            .ready_provider()
            .ok()
            .and_then(|provider| provider.current_account())
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_account().is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.host.subscribe()
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.host.subscribe_lifecycle()
    }
}

impl Default for AccountService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service for AccountService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Account
    }

    fn state(&self) -> ServiceState {
        self.host.state()
    }

    async fn initialize(&self) -> Result<()> {
        self.host.initialize().await
    }

    async fn shutdown(&self) {
        self.host.shutdown().await
    }
}

impl ServiceType for AccountService {
    const KIND: ServiceKind = ServiceKind::Account;
}
