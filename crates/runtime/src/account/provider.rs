//! Account provider contract and the device-local implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::Account;
use super::types::StoredAccount;
use crate::api::{Result, ServiceError, ServiceKind, ServiceProvider};
use crate::events::{AccountEvent, EventSink};
use crate::repository::BlobStore;
use crate::utils::{Clock, SystemClock};

const ACCOUNT_KEY: &str = "account";

#[async_trait]
pub trait AccountProvider: ServiceProvider<AccountEvent> {
    /// Register a new account and log it in.
    async fn create_account(&self, username: &str, password: &str, email: &str)
    -> Result<Account>;

    async fn login(&self, username: &str, password: &str) -> Result<Account>;

    /// Start an anonymous session.
    async fn login_as_guest(&self) -> Result<Account>;

    async fn logout(&self) -> Result<()>;

    /// Replace the profile of the logged-in account.
    async fn update_account(&self, account: Account) -> Result<()>;

    fn current_account(&self) -> Option<Account>;

    fn is_logged_in(&self) -> bool {
        self.current_account().is_some()
    }
}

#[derive(Default)]
struct AccountState {
    stored: StoredAccount,
    current: Option<Account>,
}

/// Single-account device profile kept in the blob store.
///
/// There is no credential authority on the device, so passwords are
/// accepted but not checked. Guest sessions live in memory only.
pub struct LocalAccountProvider {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<AccountState>,
    initialized: AtomicBool,
    events: Mutex<EventSink<AccountEvent>>,
}

impl LocalAccountProvider {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            state: Mutex::new(AccountState::default()),
            initialized: AtomicBool::new(false),
            events: Mutex::new(EventSink::detached()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ServiceError::NotInitialized {
                service: ServiceKind::Account,
            })
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, AccountState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AccountEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(event);
    }

    fn persist(&self, stored: &StoredAccount) -> Result<()> {
        let bytes = serde_json::to_vec(stored)?;
        self.store.save(ACCOUNT_KEY, &bytes)?;
        Ok(())
    }

    /// Persist `stored`, then make `current` the active session.
    fn commit(&self, stored: StoredAccount, current: Option<Account>) -> Result<()> {
        let mut state = self.lock_state();
        self.persist(&stored)?;
        state.stored = stored;
        state.current = current;
        Ok(())
    }

    fn fail_login(&self, reason: String) -> ServiceError {
        tracing::warn!("Login failed: {}", reason);
        self.emit(AccountEvent::LoginFailed {
            reason: reason.clone(),
        });
        ServiceError::NotFound(reason)
    }
}

#[async_trait]
impl ServiceProvider<AccountEvent> for LocalAccountProvider {
    fn name(&self) -> &str {
        "local-account"
    }

    async fn initialize(&self, events: EventSink<AccountEvent>) -> Result<()> {
        let stored: StoredAccount = match self.store.load(ACCOUNT_KEY)? {
            Some(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).map_err(|e| {
                tracing::error!("Stored account is unreadable, refusing to start: {}", e);
                ServiceError::Serialization(format!("stored account: {}", e))
            })?,
            _ => StoredAccount::default(),
        };

        {
            let mut state = self.lock_state();
            state.current = stored.account.clone().filter(|_| stored.logged_in);
            if let Some(account) = &state.current {
                tracing::info!("Restored session for {}", account.username);
            }
            state.stored = stored;
        }
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = events;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    async fn shutdown(&self) {
        self.initialized.store(false, Ordering::Release);
        self.lock_state().current = None;
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = EventSink::detached();
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

#[async_trait]
impl AccountProvider for LocalAccountProvider {
    async fn create_account(
        &self,
        username: &str,
        _password: &str,
        email: &str,
    ) -> Result<Account> {
        self.ensure_initialized()?;
        let username = username.trim();
        if username.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "username must not be empty".to_string(),
            ));
        }

        let account = Account::register(username, email, self.clock.now());
        let stored = StoredAccount {
            account: Some(account.clone()),
            logged_in: true,
        };
        self.commit(stored, Some(account.clone()))?;

        tracing::info!("Created account {} ({})", account.username, account.user_id);
        self.emit(AccountEvent::LoginSucceeded(Box::new(account.clone())));
        Ok(account)
    }

    async fn login(&self, username: &str, _password: &str) -> Result<Account> {
        self.ensure_initialized()?;

        let registered = self.lock_state().stored.account.clone();
        let mut account = match registered {
            Some(account) if account.username == username.trim() => account,
            _ => return Err(self.fail_login(format!("no account named '{}'", username))),
        };

        account.last_login_at = self.clock.now();
        let stored = StoredAccount {
            account: Some(account.clone()),
            logged_in: true,
        };
        self.commit(stored, Some(account.clone()))?;

        self.emit(AccountEvent::LoginSucceeded(Box::new(account.clone())));
        Ok(account)
    }

    async fn login_as_guest(&self) -> Result<Account> {
        self.ensure_initialized()?;

        let guest = Account::guest(self.clock.now());
        let stored = StoredAccount {
            logged_in: false,
            ..self.lock_state().stored.clone()
        };
        self.commit(stored, Some(guest.clone()))?;

        tracing::info!("Started guest session {}", guest.user_id);
        self.emit(AccountEvent::LoginSucceeded(Box::new(guest.clone())));
        Ok(guest)
    }

    async fn logout(&self) -> Result<()> {
        self.ensure_initialized()?;

        let stored = StoredAccount {
            logged_in: false,
            ..self.lock_state().stored.clone()
        };
        self.commit(stored, None)?;
        self.emit(AccountEvent::LoggedOut);
        Ok(())
    }

    async fn update_account(&self, account: Account) -> Result<()> {
        self.ensure_initialized()?;

        let stored = {
            let state = self.lock_state();
            let current = state.current.as_ref().ok_or_else(|| {
                ServiceError::InvalidArgument("no account logged in".to_string())
            })?;
            if current.user_id != account.user_id {
                return Err(ServiceError::InvalidArgument(format!(
                    "account {} is not the logged-in account",
                    account.user_id
                )));
            }
            if account.is_guest {
                state.stored.clone()
            } else {
                StoredAccount {
                    account: Some(account.clone()),
                    logged_in: true,
                }
            }
        };
        self.commit(stored, Some(account))
    }

    fn current_account(&self) -> Option<Account> {
        if !self.is_initialized() {
            return None;
        }
        self.lock_state().current.clone()
    }
}
