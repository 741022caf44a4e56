//! Public service API surface.
//!
//! This module gathers the lifecycle framework shared by every service kind:
//! the provider contract, the generic [`ServiceHost`] that binds exactly one
//! provider, and the [`ServiceContext`] registry that owns one service per kind.

pub mod errors;
pub mod host;
pub mod providers;
pub mod registry;

pub use errors::{Result, ServiceError};
pub use host::{ServiceHost, ServiceState};
pub use providers::{ServiceKind, ServiceProvider};
pub use registry::{Service, ServiceContext, ServiceType};
