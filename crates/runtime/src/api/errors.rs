//! Unified error types surfaced by the service API.
//!
//! Expected conditions (missing key, remote offline, service not ready) are
//! returned as [`ServiceError`] values; nothing in the service layer panics on
//! them.

use thiserror::Error;

use super::providers::ServiceKind;
pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Operation attempted outside the `Initialized` state.
    #[error("{service} service not initialized")]
    NotInitialized { service: ServiceKind },

    #[error("{service} provider not set")]
    ProviderNotSet { service: ServiceKind },

    /// `set_provider` called while the service is initialized (or mid-transition).
    #[error("cannot replace the {service} provider while the service is initialized")]
    ProviderBound { service: ServiceKind },

    #[error("provider {provider} failed to initialize: {reason}")]
    ProviderInit { provider: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// Cloud provider not initialized, unreachable, or it rejected the request.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Stored payload is corrupt or incompatible; the local copy should be treated as lost.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }

    pub fn is_not_initialized(&self) -> bool {
        matches!(self, ServiceError::NotInitialized { .. })
    }

    /// Whether retrying (possibly after initializing) can succeed.
    ///
    /// Corrupt payloads are not retried blindly.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ServiceError::Serialization(_)
                | ServiceError::Repository(RepositoryError::Serialization(_))
        )
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Serialization(err.to_string())
    }
}
