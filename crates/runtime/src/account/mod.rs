//! Player account service: registered and guest sessions.

mod provider;
mod service;
mod types;

pub use provider::{AccountProvider, LocalAccountProvider};
pub use service::AccountService;
pub use types::Account;
