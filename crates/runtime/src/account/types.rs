//! Player account records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    #[serde(default)]
    pub is_guest: bool,
}

impl Account {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, now: DateTime<Utc>) -> Self {
        let username = username.into();
        Self {
            user_id: user_id.into(),
            display_name: username.clone(),
            username,
            email: String::new(),
            avatar_url: String::new(),
            created_at: now,
            last_login_at: now,
            is_guest: false,
        }
    }

    /// Fresh registered account with a random id.
    pub fn register(username: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            ..Self::new(Uuid::new_v4().to_string(), username, now)
        }
    }

    /// Anonymous account: `guest_{uuid}` named `Guest_{first 8 hex digits}`.
    pub fn guest(now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            is_guest: true,
            ..Self::new(format!("guest_{}", id), format!("Guest_{}", &id[..8]), now)
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// What the local provider keeps on disk.
///
/// The registered account survives logout so it can log in again later;
/// `logged_in` restores the session on the next start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredAccount {
    pub account: Option<Account>,
    pub logged_in: bool,
}
