//! Mailbox requests and the weak dispatcher handle.

use crate::core::{State, TransitionOutcome};
use crate::repository::error::{TransitionError, Transitioned};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::trace;
use tokio::sync::{mpsc, oneshot};

pub(crate) type TransitionFn<S> = Box<dyn FnOnce(&S) -> TransitionOutcome<S> + Send>;
pub(crate) type Reply<S> = oneshot::Sender<Result<Transitioned<S>, TransitionError>>;

/// One queued transition request.
pub(crate) struct Job<S: State> {
    pub(crate) apply: TransitionFn<S>,
    pub(crate) reply: Option<Reply<S>>,
}

/// Enqueue `f`, returning the receiver for the executor's answer.
pub(crate) fn enqueue<S, F>(
    mailbox: &mpsc::UnboundedSender<Job<S>>,
    repository: &str,
    f: F,
) -> Result<oneshot::Receiver<Result<Transitioned<S>, TransitionError>>, TransitionError>
where
    S: State,
    F: FnOnce(&S) -> TransitionOutcome<S> + Send + 'static,
{
    let (reply, answer) = oneshot::channel();
    let job = Job {
        apply: Box::new(f),
        reply: Some(reply),
    };
    mailbox.send(job).map_err(|_| closed(repository))?;
    Ok(answer)
}

/// Enqueue `f` without waiting for the result.
pub(crate) fn post<S, F>(
    mailbox: &mpsc::UnboundedSender<Job<S>>,
    repository: &str,
    f: F,
) -> Result<(), TransitionError>
where
    S: State,
    F: FnOnce(&S) -> TransitionOutcome<S> + Send + 'static,
{
    let job = Job {
        apply: Box::new(f),
        reply: None,
    };
    mailbox.send(job).map_err(|_| closed(repository))
}

/// Wait for the executor's answer to an enqueued request.
pub(crate) async fn answer<S: State>(
    receiver: oneshot::Receiver<Result<Transitioned<S>, TransitionError>>,
    repository: &str,
) -> Result<Transitioned<S>, TransitionError> {
    receiver.await.map_err(|_| closed(repository))?
}

pub(crate) fn closed(repository: &str) -> TransitionError {
    TransitionError::Closed {
        repository: repository.to_string(),
    }
}

/// Non-owning handle that enqueues transitions into a repository.
///
/// Dispatchers are handed to lifecycle hooks and monitors. They do not keep
/// the repository alive: once every
/// [`StateRepository`](crate::repository::StateRepository) handle is dropped
/// or the repository is closed, dispatching fails with
/// [`TransitionError::Closed`].
pub struct Dispatcher<S: State> {
    mailbox: mpsc::WeakUnboundedSender<Job<S>>,
    repository: Arc<str>,
    runtime: Handle,
    committed: Arc<AtomicU64>,
}

impl<S: State> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
            repository: Arc::clone(&self.repository),
            runtime: self.runtime.clone(),
            committed: Arc::clone(&self.committed),
        }
    }
}

impl<S: State> Dispatcher<S> {
    pub(crate) fn new(
        mailbox: mpsc::WeakUnboundedSender<Job<S>>,
        repository: Arc<str>,
        runtime: Handle,
    ) -> Self {
        Self {
            mailbox,
            repository,
            runtime,
            committed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Called by the executor after each commit, before any hook runs.
    pub(crate) fn record_commit(&self, sequence: u64) {
        self.committed.store(sequence, Ordering::SeqCst);
    }

    fn upgrade(&self) -> Result<mpsc::UnboundedSender<Job<S>>, TransitionError> {
        self.mailbox
            .upgrade()
            .ok_or_else(|| closed(&self.repository))
    }

    /// Enqueue a transition without waiting for it to be applied.
    ///
    /// Safe to call from synchronous callbacks on any thread, and from inside
    /// lifecycle hooks, where the request runs after the current transition
    /// completes.
    pub fn dispatch<F>(&self, f: F) -> Result<(), TransitionError>
    where
        F: FnOnce(&S) -> TransitionOutcome<S> + Send + 'static,
    {
        post(&self.upgrade()?, &self.repository, f)
    }

    /// Sequence number of the latest commit; zero before the first one.
    pub fn sequence(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    /// Enqueue a transition that only applies if nothing was committed after
    /// `seen`, otherwise it is a Remain.
    ///
    /// For observations made outside the executor: capture
    /// [`sequence`](Self::sequence) before observing, and an answer that
    /// arrives after another commit cannot overwrite it.
    pub fn dispatch_unless_moved<F>(&self, seen: u64, f: F) -> Result<(), TransitionError>
    where
        F: FnOnce(&S) -> TransitionOutcome<S> + Send + 'static,
    {
        let committed = Arc::clone(&self.committed);
        let repository = Arc::clone(&self.repository);
        self.dispatch(move |state| {
            let latest = committed.load(Ordering::SeqCst);
            if latest != seen {
                trace!(repository = %repository, seen, latest, "Dropping stale observation");
                return TransitionOutcome::Remain;
            }
            f(state)
        })
    }

    /// Enqueue a transition and wait until it has been applied.
    ///
    /// Must not be awaited from inside a lifecycle hook's own transition;
    /// spawned tasks may await it freely.
    pub async fn transition<F>(&self, f: F) -> Result<Transitioned<S>, TransitionError>
    where
        F: FnOnce(&S) -> TransitionOutcome<S> + Send + 'static,
    {
        let receiver = enqueue(&self.upgrade()?, &self.repository, f)?;
        answer(receiver, &self.repository).await
    }

    /// Name of the repository this dispatcher feeds.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Runtime the repository's executor runs on, for spawning side work.
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox
            .upgrade()
            .map_or(true, |mailbox| mailbox.is_closed())
    }
}
