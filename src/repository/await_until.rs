//! Suspending until a repository reaches a state matched by a resolver.

use crate::core::{first_match, Resolver, State};
use crate::repository::subscription::Subscription;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Why an await finished without a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Token,
    /// The caller's deadline passed.
    Timeout,
    /// The repository was torn down.
    Closed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "cancelled by caller"),
            Self::Timeout => write!(f, "timed out"),
            Self::Closed => write!(f, "repository closed"),
        }
    }
}

/// Result of awaiting a set of resolvers.
#[derive(Debug, Clone, PartialEq)]
pub enum AwaitOutcome<O> {
    Resolved(O),
    Cancelled(CancelReason),
}

impl<O> AwaitOutcome<O> {
    pub fn resolved(self) -> Option<O> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Cancelled(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Consume `subscription` until a resolver matches, the token fires, the
/// deadline passes, or the repository goes away.
///
/// The replayed current state is checked first, so an already-satisfied
/// predicate resolves without waiting. The subscription is released when this
/// returns or when the future is dropped.
pub(crate) async fn await_until<S, O>(
    mut subscription: Subscription<S>,
    resolvers: &[Resolver<S, O>],
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
) -> AwaitOutcome<O>
where
    S: State,
{
    let cancel = cancel.unwrap_or_default();
    let deadline = timeout.map(|timeout| tokio::time::Instant::now() + timeout);

    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break AwaitOutcome::Cancelled(CancelReason::Token),
            _ = sleep_until(deadline) => break AwaitOutcome::Cancelled(CancelReason::Timeout),
            next = subscription.next() => match next {
                Some(state) => {
                    if let Some(value) = first_match(resolvers, &state) {
                        trace!(state = state.tag(), "Await resolved");
                        break AwaitOutcome::Resolved(value);
                    }
                }
                None => break AwaitOutcome::Cancelled(CancelReason::Closed),
            },
        }
    };

    subscription.unsubscribe();
    outcome
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
