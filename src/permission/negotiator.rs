//! One permission's state machine and its request operation.

use crate::builder::{BuildError, RepositoryBuilder};
use crate::config::{ConfigError, PermissionConfig};
use crate::core::{Resolver, TransitionOutcome};
use crate::permission::monitor::PollingMonitor;
use crate::permission::platform::{PermissionKind, PermissionPlatform, PlatformStatus};
use crate::permission::state::{
    begin_request, on_platform_status, request_outcome, resolve_request, PermissionState,
    RequestOutcome,
};
use crate::repository::{
    AwaitOutcome, CancelReason, HookContext, Lifecycle, StateRepository, Subscription,
    TransitionError,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Errors from negotiating a permission.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Request for permission '{kind}' ended early: {reason}")]
    Cancelled {
        kind: PermissionKind,
        reason: CancelReason,
    },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Runs the platform request while the machine is `Requesting`.
///
/// Entering `Requesting` spawns the request; leaving it, or tearing the
/// repository down, aborts the task and bumps the generation so an answer
/// that was already dispatched is ignored.
struct RequestHooks<P> {
    kind: PermissionKind,
    platform: Arc<P>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    generation: Arc<AtomicU64>,
}

impl<P: PermissionPlatform> RequestHooks<P> {
    fn new(kind: PermissionKind, platform: Arc<P>) -> Self {
        Self {
            kind,
            platform,
            in_flight: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn cancel_in_flight(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = in_flight {
            task.abort();
        }
    }
}

impl<P> Drop for RequestHooks<P> {
    fn drop(&mut self) {
        let in_flight = self
            .in_flight
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = in_flight {
            task.abort();
        }
    }
}

impl<P: PermissionPlatform> Lifecycle<PermissionState> for RequestHooks<P> {
    fn on_enter(&self, state: &PermissionState, ctx: &HookContext<'_, PermissionState>) {
        if *state != PermissionState::Requesting {
            return;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let current = Arc::clone(&self.generation);
        let platform = Arc::clone(&self.platform);
        let kind = self.kind.clone();
        let dispatcher = ctx.dispatcher();
        debug!(permission = %kind, sequence = ctx.sequence(), "Asking platform");

        let task = dispatcher.runtime().clone().spawn(async move {
            let status = match platform.request(&kind).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(permission = %kind, error = %err, "Permission request failed");
                    PlatformStatus::Denied {
                        can_ask_again: true,
                    }
                }
            };

            let answered = dispatcher.dispatch(move |state| {
                if current.load(Ordering::SeqCst) != generation {
                    return TransitionOutcome::Remain;
                }
                resolve_request(state, status)
            });
            if answered.is_err() {
                debug!(permission = %kind, "Repository closed before the platform answered");
            }
        });

        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn on_exit(&self, state: &PermissionState, _ctx: &HookContext<'_, PermissionState>) {
        if *state != PermissionState::Requesting {
            return;
        }
        self.cancel_in_flight();
    }

    fn on_close(&self, state: &PermissionState) {
        if *state == PermissionState::Requesting {
            debug!(permission = %self.kind, "Cancelling platform request on close");
        }
        self.cancel_in_flight();
    }
}

/// Negotiates one permission with the platform.
///
/// Cloning shares the underlying repository. While anyone is subscribed the
/// platform status is polled; [`request`](Self::request) shows the platform
/// dialog at most once for any number of concurrent callers.
#[derive(Clone)]
pub struct PermissionNegotiator {
    kind: PermissionKind,
    repository: StateRepository<PermissionState>,
}

impl PermissionNegotiator {
    /// Create a negotiator starting in `Unknown`. Must be called inside a
    /// Tokio runtime.
    pub fn new<P: PermissionPlatform>(
        kind: PermissionKind,
        platform: Arc<P>,
        config: &PermissionConfig,
    ) -> Result<Self, PermissionError> {
        Self::with_initial(kind, platform, config, PermissionState::Unknown)
    }

    /// Create a negotiator starting in `initial`, e.g. a status the caller
    /// already knows.
    pub fn with_initial<P: PermissionPlatform>(
        kind: PermissionKind,
        platform: Arc<P>,
        config: &PermissionConfig,
        initial: PermissionState,
    ) -> Result<Self, PermissionError> {
        config.validate()?;

        let repository = RepositoryBuilder::with_config(config.repository.clone())
            .name(format!("{}.{}", config.repository.name, kind))
            .initial(initial)
            .lifecycle(RequestHooks::new(kind.clone(), Arc::clone(&platform)))
            .monitor(PollingMonitor::new(
                kind.clone(),
                platform,
                config.poll_interval(),
            ))
            .build()?;

        Ok(Self { kind, repository })
    }

    pub fn kind(&self) -> &PermissionKind {
        &self.kind
    }

    pub fn state(&self) -> PermissionState {
        self.repository.current_state()
    }

    /// Observe the permission; keeps the platform status polled.
    pub fn subscribe(&self) -> Subscription<PermissionState> {
        self.repository.subscribe()
    }

    pub fn repository(&self) -> &StateRepository<PermissionState> {
        &self.repository
    }

    /// Ask for the permission and wait for the answer.
    ///
    /// Waits for an `Unknown` status to be read first. From `Denied.Requestable`
    /// this moves to `Requesting`, which asks the platform; callers arriving
    /// while a request is in flight join it. From `Allowed` or `Denied.Locked`
    /// the current answer is returned immediately.
    pub async fn request(&self) -> Result<RequestOutcome, PermissionError> {
        let _watching = self.repository.subscribe();

        let known = Resolver::new(|state: &PermissionState| {
            (*state != PermissionState::Unknown).then_some(())
        });
        if let AwaitOutcome::Cancelled(reason) = self.repository.await_until(&[known]).await {
            return Err(self.cancelled(reason));
        }

        let begun = self.repository.transition(begin_request).await?;
        debug!(
            permission = %self.kind,
            joined = !begun.is_moved(),
            state = ?begun.state(),
            "Permission request"
        );

        match self
            .repository
            .await_until(&[Resolver::new(request_outcome)])
            .await
        {
            AwaitOutcome::Resolved(outcome) => Ok(outcome),
            AwaitOutcome::Cancelled(reason) => Err(self.cancelled(reason)),
        }
    }

    /// Push a status delivered by a platform broadcast.
    pub fn report(&self, status: PlatformStatus) -> Result<(), TransitionError> {
        self.repository
            .dispatch(move |current| on_platform_status(current, status))
    }

    /// Tear the negotiator down; pending requests fail as cancelled.
    pub fn close(&self) {
        self.repository.close();
    }

    pub fn is_closed(&self) -> bool {
        self.repository.is_closed()
    }

    fn cancelled(&self, reason: CancelReason) -> PermissionError {
        PermissionError::Cancelled {
            kind: self.kind.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::platform::PlatformError;
    use crate::permission::state::{Denial, Grant};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct Answering {
        status: PlatformStatus,
        answer: PlatformStatus,
        requests: AtomicUsize,
    }

    impl Answering {
        fn new(status: PlatformStatus, answer: PlatformStatus) -> Arc<Self> {
            Arc::new(Self {
                status,
                answer,
                requests: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PermissionPlatform for Answering {
        async fn status(&self, _kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
            Ok(self.status)
        }

        async fn request(&self, _kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    #[tokio::test]
    async fn request_from_unknown_reads_status_then_asks() {
        let granted = PlatformStatus::Granted(Grant::permanent());
        let platform = Answering::new(PlatformStatus::NotDetermined, granted);
        let negotiator = PermissionNegotiator::new(
            PermissionKind::Camera,
            Arc::clone(&platform),
            &PermissionConfig::default(),
        )
        .unwrap();

        let outcome = negotiator.request().await.unwrap();

        assert_eq!(outcome, RequestOutcome::Granted(Grant::permanent()));
        assert_eq!(negotiator.state(), PermissionState::Allowed(Grant::permanent()));
        assert_eq!(platform.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn locked_permission_is_denied_without_asking() {
        let platform = Answering::new(
            PlatformStatus::Denied {
                can_ask_again: false,
            },
            PlatformStatus::Granted(Grant::permanent()),
        );
        let negotiator = PermissionNegotiator::with_initial(
            PermissionKind::Microphone,
            Arc::clone(&platform),
            &PermissionConfig::default(),
            PermissionState::Denied(Denial::Locked),
        )
        .unwrap();

        let outcome = negotiator.request().await.unwrap();

        assert_eq!(outcome, RequestOutcome::Denied(Denial::Locked));
        assert_eq!(platform.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repository_name_includes_kind() {
        let platform = Answering::new(PlatformStatus::NotDetermined, PlatformStatus::NotDetermined);
        let negotiator = PermissionNegotiator::new(
            PermissionKind::Contacts { write: true },
            platform,
            &PermissionConfig::default(),
        )
        .unwrap();

        assert_eq!(negotiator.repository().name(), "permission.contacts.write");
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let platform = Answering::new(PlatformStatus::NotDetermined, PlatformStatus::NotDetermined);
        let config = PermissionConfig {
            poll_interval_ms: 0,
            ..PermissionConfig::default()
        };

        let result = PermissionNegotiator::new(PermissionKind::Camera, platform, &config);
        assert!(matches!(result, Err(PermissionError::Config(_))));
    }
}
