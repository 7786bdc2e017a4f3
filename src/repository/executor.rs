//! The serialization point of a repository.
//!
//! One executor task per repository drains a FIFO mailbox. Each request reads
//! the current state, runs the transition function, and, when the result is a
//! new state, commits it, publishes it, and runs the exit/enter hooks before
//! the next request is looked at. Hooks and subscribers never hold a lock, and
//! anything they dispatch lands behind the request being processed.

use crate::core::{State, StateHistory, StateTransition};
use crate::enforcement::{describe, EdgeContext, EdgeRules, GraphPolicy};
use crate::repository::dispatcher::{Dispatcher, Job, TransitionFn};
use crate::repository::error::{TransitionError, Transitioned};
use crate::repository::hooks::{HookContext, Lifecycle};
use chrono::Utc;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use stillwater::validation::Validation;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

pub(crate) struct Executor<S: State> {
    pub(crate) repository: String,
    pub(crate) state: watch::Sender<S>,
    pub(crate) mailbox: mpsc::UnboundedReceiver<Job<S>>,
    pub(crate) lifecycle: Option<Arc<dyn Lifecycle<S>>>,
    pub(crate) rules: EdgeRules<S>,
    pub(crate) policy: GraphPolicy,
    pub(crate) history: Arc<Mutex<StateHistory<S>>>,
    pub(crate) dispatcher: Dispatcher<S>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) sequence: u64,
}

impl<S: State> Executor<S> {
    pub(crate) async fn run(mut self) {
        let initial = self.state.borrow().clone();
        self.enter(&initial, 0);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                job = self.mailbox.recv() => match job {
                    Some(job) => self.apply(job),
                    None => break,
                },
            }
        }

        self.mailbox.close();
        let last = self.state.borrow().clone();
        self.close_hooks(&last);
        debug!(repository = %self.repository, sequence = self.sequence, "Executor stopped");
    }

    fn apply(&mut self, job: Job<S>) {
        let Job { apply, reply } = job;
        let result = self.step(apply);
        if let Some(reply) = reply {
            // The caller may have stopped waiting; the commit stands either way.
            let _ = reply.send(result);
        }
    }

    fn step(&mut self, apply: TransitionFn<S>) -> Result<Transitioned<S>, TransitionError> {
        let current = self.state.borrow().clone();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| apply(&current))).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            error!(repository = %self.repository, state = current.tag(), %message, "Transition function panicked");
            TransitionError::Panicked {
                repository: self.repository.clone(),
                message,
            }
        })?;

        let Some(next) = outcome.resolve(&current) else {
            trace!(repository = %self.repository, state = current.tag(), "Remain");
            return Ok(Transitioned::Remained(current));
        };

        self.check_edge(&current, &next)?;

        self.sequence += 1;
        let transition = StateTransition {
            from: current,
            to: next,
            timestamp: Utc::now(),
            sequence: self.sequence,
        };
        self.record(&transition);
        self.dispatcher.record_commit(self.sequence);
        self.state.send_replace(transition.to.clone());
        debug!(
            repository = %self.repository,
            from = transition.from.tag(),
            to = transition.to.tag(),
            sequence = transition.sequence,
            "State committed"
        );

        self.exit(&transition.from, transition.sequence);
        self.enter(&transition.to, transition.sequence);

        Ok(Transitioned::Moved(transition))
    }

    fn check_edge(&self, from: &S, to: &S) -> Result<(), TransitionError> {
        if self.policy == GraphPolicy::Trust {
            return Ok(());
        }

        let context = EdgeContext::new(from.clone(), to.clone());
        let Validation::Failure(violations) = self.rules.enforce(&context) else {
            return Ok(());
        };

        let reasons = describe(&violations);
        match self.policy {
            GraphPolicy::Enforce => {
                warn!(repository = %self.repository, from = from.tag(), to = to.tag(), %reasons, "Edge rejected");
                Err(TransitionError::EdgeRejected {
                    repository: self.repository.clone(),
                    from: from.tag(),
                    to: to.tag(),
                    reasons,
                })
            }
            _ => {
                warn!(repository = %self.repository, from = from.tag(), to = to.tag(), %reasons, "Edge violates state graph");
                Ok(())
            }
        }
    }

    fn record(&self, transition: &StateTransition<S>) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transition.clone());
    }

    fn enter(&self, state: &S, sequence: u64) {
        if let Some(lifecycle) = &self.lifecycle {
            let ctx = HookContext::new(&self.dispatcher, sequence);
            self.guard_hook("on_enter", state, || lifecycle.on_enter(state, &ctx));
        }
    }

    fn exit(&self, state: &S, sequence: u64) {
        if let Some(lifecycle) = &self.lifecycle {
            let ctx = HookContext::new(&self.dispatcher, sequence);
            self.guard_hook("on_exit", state, || lifecycle.on_exit(state, &ctx));
        }
    }

    fn close_hooks(&self, state: &S) {
        if let Some(lifecycle) = &self.lifecycle {
            self.guard_hook("on_close", state, || lifecycle.on_close(state));
        }
    }

    fn guard_hook(&self, hook: &'static str, state: &S, run: impl FnOnce()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(run)) {
            let message = panic_message(payload.as_ref());
            error!(repository = %self.repository, hook, state = state.tag(), %message, "Lifecycle hook panicked");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
