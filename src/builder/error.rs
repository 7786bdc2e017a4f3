//! Build errors for repositories.

use thiserror::Error;

/// Errors that can occur when building a repository.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("No Tokio runtime available. Build inside a runtime or call .runtime(handle)")]
    NoRuntime,

    #[error("Both .lifecycle() and .on_enter()/.on_exit() were given. Use one or the other")]
    ConflictingLifecycle,

    #[error("Both .monitor() and .on_first_subscriber()/.on_last_unsubscribed() were given. Use one or the other")]
    ConflictingMonitor,
}
