//! Runtime permission negotiation.
//!
//! Each permission kind gets a [`PermissionNegotiator`]: a
//! [`StateRepository`](crate::repository::StateRepository) over
//! [`PermissionState`] whose transitions come from three sources:
//!
//! - [`PermissionNegotiator::request`], which moves `Denied.Requestable` to
//!   `Requesting` and waits for a terminal state
//! - the platform's answer to the request, started on entering `Requesting`
//! - status observations, polled by [`PollingMonitor`] while anyone is
//!   subscribed or pushed through [`PermissionNegotiator::report`]
//!
//! The executor orders all of them, so a poll racing a request answer can
//! only ever see the state the other one left behind.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use statecell::config::PermissionConfig;
//! use statecell::permission::{
//!     Grant, PermissionKind, PermissionPlatform, Permissions, PlatformError, PlatformStatus,
//!     RequestOutcome,
//! };
//! use std::sync::Arc;
//!
//! struct AlwaysYes;
//!
//! #[async_trait]
//! impl PermissionPlatform for AlwaysYes {
//!     async fn status(&self, _: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
//!         Ok(PlatformStatus::NotDetermined)
//!     }
//!
//!     async fn request(&self, _: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
//!         Ok(PlatformStatus::Granted(Grant::permanent()))
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let permissions = Permissions::new(Arc::new(AlwaysYes), PermissionConfig::default()).unwrap();
//! let outcome = permissions.request(&PermissionKind::Camera).await.unwrap();
//! assert_eq!(outcome, RequestOutcome::Granted(Grant::permanent()));
//! # });
//! ```

mod cache;
mod monitor;
mod negotiator;
mod platform;
mod registry;
mod state;

pub use cache::{CachedPlatform, PermissionCache};
pub use monitor::PollingMonitor;
pub use negotiator::{PermissionError, PermissionNegotiator};
pub use platform::{PermissionKind, PermissionPlatform, PlatformError, PlatformStatus};
pub use registry::Permissions;
pub use state::{
    begin_request, on_platform_status, on_status_unavailable, request_outcome, resolve_request,
    Denial, Grant, InvalidGrant, PermissionState, RequestOutcome,
};
