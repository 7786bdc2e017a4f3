//! Lifecycle hooks invoked when states are entered and left.

use crate::core::{State, TransitionOutcome};
use crate::repository::dispatcher::Dispatcher;
use crate::repository::error::TransitionError;

/// Context handed to lifecycle hooks.
pub struct HookContext<'a, S: State> {
    dispatcher: &'a Dispatcher<S>,
    sequence: u64,
}

impl<'a, S: State> HookContext<'a, S> {
    pub(crate) fn new(dispatcher: &'a Dispatcher<S>, sequence: u64) -> Self {
        Self {
            dispatcher,
            sequence,
        }
    }

    /// Sequence number of the commit that triggered this hook.
    ///
    /// Zero for the initial state's `on_enter`.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Schedule a follow-up transition, applied after the current one completes.
    pub fn dispatch<F>(&self, f: F) -> Result<(), TransitionError>
    where
        F: FnOnce(&S) -> TransitionOutcome<S> + Send + 'static,
    {
        self.dispatcher.dispatch(f)
    }

    /// A dispatcher that async work spawned by the hook can keep.
    pub fn dispatcher(&self) -> Dispatcher<S> {
        self.dispatcher.clone()
    }
}

/// Callbacks attached to states.
///
/// For every committed transition `on_exit` of the old state runs before
/// `on_enter` of the new one, each exactly once, on the repository's
/// executor and outside of any lock. Hooks must not block; async work they
/// start on entering a state must be cancelled when that state is left.
///
/// `on_close` runs once when the repository is torn down, with the last
/// committed state, in place of that state's `on_exit`. Work still in flight
/// must be cancelled there.
pub trait Lifecycle<S: State>: Send + Sync + 'static {
    fn on_enter(&self, _state: &S, _ctx: &HookContext<'_, S>) {}

    fn on_exit(&self, _state: &S, _ctx: &HookContext<'_, S>) {}

    fn on_close(&self, _state: &S) {}
}

type CloseFn<S> = Box<dyn Fn(&S) + Send + Sync>;

type HookFn<S> = Box<dyn Fn(&S, &HookContext<'_, S>) + Send + Sync>;

/// Lifecycle built from closures.
pub struct FnLifecycle<S: State> {
    enter: Option<HookFn<S>>,
    exit: Option<HookFn<S>>,
    close: Option<CloseFn<S>>,
}

impl<S: State> FnLifecycle<S> {
    pub fn new() -> Self {
        Self {
            enter: None,
            exit: None,
            close: None,
        }
    }

    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&S, &HookContext<'_, S>) + Send + Sync + 'static,
    {
        self.enter = Some(Box::new(hook));
        self
    }

    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&S, &HookContext<'_, S>) + Send + Sync + 'static,
    {
        self.exit = Some(Box::new(hook));
        self
    }

    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.close = Some(Box::new(hook));
        self
    }
}

impl<S: State> Default for FnLifecycle<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> Lifecycle<S> for FnLifecycle<S> {
    fn on_enter(&self, state: &S, ctx: &HookContext<'_, S>) {
        if let Some(hook) = &self.enter {
            hook(state, ctx);
        }
    }

    fn on_exit(&self, state: &S, ctx: &HookContext<'_, S>) {
        if let Some(hook) = &self.exit {
            hook(state, ctx);
        }
    }

    fn on_close(&self, state: &S) {
        if let Some(hook) = &self.close {
            hook(state);
        }
    }
}
