//! Observable, concurrency-safe state repositories.
//!
//! A [`StateRepository`] owns exactly one current state. All mutation goes
//! through transition functions that are queued into the repository's
//! executor and applied one at a time, in arrival order. Committed states are
//! published to every [`Subscription`] (replay of the latest value, then
//! conflated updates), drive [`Lifecycle`] hooks, and wake callers suspended
//! in [`await_until`](StateRepository::await_until).
//!
//! A [`Monitor`] attached to the repository runs only while at least one
//! subscription is alive.
//!
//! # Example
//!
//! ```rust
//! use statecell::builder::RepositoryBuilder;
//! use statecell::core::{Resolver, TransitionOutcome};
//! use statecell::repository::AwaitOutcome;
//! use statecell::state_enum;
//!
//! state_enum! {
//!     pub enum Scanner {
//!         Idle,
//!         Scanning,
//!         Found,
//!     }
//!     edges: {
//!         Idle => [Scanning],
//!         Scanning => [Idle, Found],
//!         Found => [Idle],
//!     }
//! }
//!
//! # tokio_test_runtime(async {
//! let scanner = RepositoryBuilder::new()
//!     .name("scanner")
//!     .initial(Scanner::Idle)
//!     .build()
//!     .unwrap();
//!
//! let mut updates = scanner.subscribe();
//! assert_eq!(updates.next().await, Some(Scanner::Idle));
//!
//! scanner.transition(|_| TransitionOutcome::To(Scanner::Scanning)).await.unwrap();
//! assert_eq!(updates.next().await, Some(Scanner::Scanning));
//!
//! let dispatcher = scanner.dispatcher();
//! dispatcher.dispatch(|_| TransitionOutcome::To(Scanner::Found)).unwrap();
//!
//! let found = scanner
//!     .await_until(&[Resolver::when(|s: &Scanner| *s == Scanner::Found, "found")])
//!     .await;
//! assert_eq!(found, AwaitOutcome::Resolved("found"));
//! # });
//! # fn tokio_test_runtime<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

mod activation;
mod await_until;
mod dispatcher;
mod error;
mod executor;
mod hooks;
mod subscription;

pub use activation::{FnMonitor, Monitor};
pub use await_until::{AwaitOutcome, CancelReason};
pub use dispatcher::Dispatcher;
pub use error::{TransitionError, Transitioned, TryTransitionError};
pub use hooks::{FnLifecycle, HookContext, Lifecycle};
pub use subscription::Subscription;

use crate::core::{Resolver, State, StateHistory, TransitionOutcome};
use crate::enforcement::{EdgeRules, GraphPolicy};
use activation::Activation;
use dispatcher::{answer, enqueue, post, Job};
use executor::Executor;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Everything needed to start a repository.
pub(crate) struct RepositoryParts<S: State> {
    pub(crate) name: String,
    pub(crate) initial: S,
    pub(crate) lifecycle: Option<Arc<dyn Lifecycle<S>>>,
    pub(crate) monitor: Option<Box<dyn Monitor<S>>>,
    pub(crate) rules: EdgeRules<S>,
    pub(crate) policy: GraphPolicy,
    pub(crate) history_capacity: usize,
    pub(crate) runtime: Handle,
}

struct Shared<S: State> {
    name: Arc<str>,
    snapshot: watch::Receiver<S>,
    history: Arc<Mutex<StateHistory<S>>>,
    activation: Arc<Activation<S>>,
    dispatcher: Dispatcher<S>,
    shutdown: CancellationToken,
}

/// Handle to a state repository.
///
/// Cloning the handle shares the same repository. The repository is torn
/// down when [`close`](StateRepository::close) is called or the last handle
/// is dropped: queued transitions are discarded, subscriptions end, pending
/// awaits resolve as [`CancelReason::Closed`], and an active monitor is
/// stopped.
pub struct StateRepository<S: State> {
    shared: Arc<Shared<S>>,
    mailbox: mpsc::UnboundedSender<Job<S>>,
}

impl<S: State> Clone for StateRepository<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<S: State> StateRepository<S> {
    pub(crate) fn spawn(parts: RepositoryParts<S>) -> Self {
        let RepositoryParts {
            name,
            initial,
            lifecycle,
            monitor,
            rules,
            policy,
            history_capacity,
            runtime,
        } = parts;

        let name: Arc<str> = Arc::from(name);
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let (state, snapshot) = watch::channel(initial);
        let dispatcher = Dispatcher::new(mailbox.downgrade(), Arc::clone(&name), runtime.clone());
        let history = Arc::new(Mutex::new(StateHistory::with_capacity(history_capacity)));
        let shutdown = CancellationToken::new();
        let activation = Arc::new(Activation::new(
            name.to_string(),
            monitor,
            dispatcher.clone(),
        ));

        let executor = Executor {
            repository: name.to_string(),
            state,
            mailbox: inbox,
            lifecycle,
            rules,
            policy,
            history: Arc::clone(&history),
            dispatcher: dispatcher.clone(),
            shutdown: shutdown.clone(),
            sequence: 0,
        };
        runtime.spawn(executor.run());
        debug!(repository = %name, "Repository started");

        Self {
            shared: Arc::new(Shared {
                name,
                snapshot,
                history,
                activation,
                dispatcher,
                shutdown,
            }),
            mailbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Non-blocking snapshot of the current state.
    pub fn current_state(&self) -> S {
        self.shared.snapshot.borrow().clone()
    }

    /// Subscribe to the current state and every later commit.
    pub fn subscribe(&self) -> Subscription<S> {
        Subscription::new(&self.shared.snapshot, Arc::clone(&self.shared.activation))
    }

    /// Number of live subscriptions, including internal ones held by awaits.
    pub fn subscriber_count(&self) -> usize {
        self.shared.activation.subscribers()
    }

    /// Whether the monitor is currently running.
    pub fn is_active(&self) -> bool {
        self.shared.activation.is_active()
    }

    /// Apply `f` to the current state and wait for the result.
    ///
    /// Requests are applied strictly in the order they were enqueued. Hooks
    /// and subscribers have been notified by the time this returns.
    pub async fn transition<F>(&self, f: F) -> Result<Transitioned<S>, TransitionError>
    where
        F: FnOnce(&S) -> TransitionOutcome<S> + Send + 'static,
    {
        let receiver = enqueue(&self.mailbox, &self.shared.name, f)?;
        answer(receiver, &self.shared.name).await
    }

    /// Apply a fallible transition function.
    ///
    /// When `f` fails the state is left unchanged, nothing is broadcast, and
    /// the error is returned to this caller only.
    pub async fn try_transition<F, E>(&self, f: F) -> Result<Transitioned<S>, TryTransitionError<E>>
    where
        F: FnOnce(&S) -> Result<TransitionOutcome<S>, E> + Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        let (failure, failed) = oneshot::channel();
        let result = self
            .transition(move |state| match f(state) {
                Ok(outcome) => outcome,
                Err(err) => {
                    let _ = failure.send(err);
                    TransitionOutcome::Remain
                }
            })
            .await?;

        match failed.await {
            Ok(err) => Err(TryTransitionError::Rejected(err)),
            Err(_) => Ok(result),
        }
    }

    /// Enqueue `f` without waiting; usable from synchronous callbacks.
    pub fn dispatch<F>(&self, f: F) -> Result<(), TransitionError>
    where
        F: FnOnce(&S) -> TransitionOutcome<S> + Send + 'static,
    {
        post(&self.mailbox, &self.shared.name, f)
    }

    /// A non-owning handle for platform callbacks and background tasks.
    pub fn dispatcher(&self) -> Dispatcher<S> {
        self.shared.dispatcher.clone()
    }

    /// Suspend until a resolver matches the current or a later state.
    pub async fn await_until<O>(&self, resolvers: &[Resolver<S, O>]) -> AwaitOutcome<O> {
        await_until::await_until(self.subscribe(), resolvers, None, None).await
    }

    /// Like [`await_until`](Self::await_until), giving up when `cancel` fires.
    pub async fn await_until_cancellable<O>(
        &self,
        resolvers: &[Resolver<S, O>],
        cancel: CancellationToken,
    ) -> AwaitOutcome<O> {
        await_until::await_until(self.subscribe(), resolvers, Some(cancel), None).await
    }

    /// Like [`await_until`](Self::await_until), giving up after `timeout`.
    pub async fn await_until_timeout<O>(
        &self,
        resolvers: &[Resolver<S, O>],
        timeout: Duration,
    ) -> AwaitOutcome<O> {
        await_until::await_until(self.subscribe(), resolvers, None, Some(timeout)).await
    }

    /// Snapshot of the retained transition history.
    pub fn history(&self) -> StateHistory<S> {
        self.shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Tear the repository down.
    ///
    /// Idempotent. Transitions still queued are discarded.
    pub fn close(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        debug!(repository = %self.shared.name, "Closing repository");
        self.shared.shutdown.cancel();
        self.shared.activation.shutdown();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.shutdown.is_cancelled() || self.mailbox.is_closed()
    }
}

impl<S: State> Drop for Shared<S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.activation.shutdown();
    }
}
