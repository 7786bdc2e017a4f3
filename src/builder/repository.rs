//! Builder for constructing state repositories.

use crate::builder::error::BuildError;
use crate::config::RepositoryConfig;
use crate::core::State;
use crate::enforcement::{EdgeRules, GraphPolicy};
use crate::repository::{
    Dispatcher, FnLifecycle, FnMonitor, HookContext, Lifecycle, Monitor, RepositoryParts,
    StateRepository,
};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Builder for constructing repositories with a fluent API.
pub struct RepositoryBuilder<S: State> {
    config: RepositoryConfig,
    initial: Option<S>,
    lifecycle: Option<Arc<dyn Lifecycle<S>>>,
    hooks: Option<FnLifecycle<S>>,
    monitor: Option<Box<dyn Monitor<S>>>,
    activation: Option<FnMonitor<S>>,
    rules: EdgeRules<S>,
    runtime: Option<Handle>,
}

impl<S: State> RepositoryBuilder<S> {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RepositoryConfig::default())
    }

    /// Create a new builder from a loaded configuration.
    pub fn with_config(config: RepositoryConfig) -> Self {
        Self {
            config,
            initial: None,
            lifecycle: None,
            hooks: None,
            monitor: None,
            activation: None,
            rules: EdgeRules::new(),
            runtime: None,
        }
    }

    /// Name used in logs and errors.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    pub fn graph_policy(mut self, policy: GraphPolicy) -> Self {
        self.config.graph_policy = policy;
        self
    }

    /// Maximum number of committed transitions kept; 0 disables history.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Extra edge checks applied under [`GraphPolicy::Warn`] and
    /// [`GraphPolicy::Enforce`].
    pub fn rules(mut self, rules: EdgeRules<S>) -> Self {
        self.rules = rules;
        self
    }

    /// Attach lifecycle hooks.
    pub fn lifecycle(mut self, lifecycle: impl Lifecycle<S>) -> Self {
        self.lifecycle = Some(Arc::new(lifecycle));
        self
    }

    /// Hook run after a state becomes current.
    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&S, &HookContext<'_, S>) + Send + Sync + 'static,
    {
        self.hooks = Some(self.hooks.take().unwrap_or_default().on_enter(hook));
        self
    }

    /// Hook run when a state stops being current.
    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&S, &HookContext<'_, S>) + Send + Sync + 'static,
    {
        self.hooks = Some(self.hooks.take().unwrap_or_default().on_exit(hook));
        self
    }

    /// Hook run once on teardown with the last committed state.
    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.hooks = Some(self.hooks.take().unwrap_or_default().on_close(hook));
        self
    }

    /// Attach a monitor driven by subscriber count.
    pub fn monitor(mut self, monitor: impl Monitor<S>) -> Self {
        self.monitor = Some(Box::new(monitor));
        self
    }

    /// Run `start` when the first subscriber appears.
    pub fn on_first_subscriber<F>(mut self, start: F) -> Self
    where
        F: Fn(Dispatcher<S>) + Send + Sync + 'static,
    {
        self.activation = Some(self.activation.take().unwrap_or_default().on_start(start));
        self
    }

    /// Run `stop` when the last subscriber leaves.
    pub fn on_last_unsubscribed<F>(mut self, stop: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.activation = Some(self.activation.take().unwrap_or_default().on_stop(stop));
        self
    }

    /// Runtime to spawn the executor on. Defaults to the current runtime.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build and start the repository.
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<StateRepository<S>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        let lifecycle = match (self.lifecycle, self.hooks) {
            (Some(_), Some(_)) => return Err(BuildError::ConflictingLifecycle),
            (Some(lifecycle), None) => Some(lifecycle),
            (None, Some(hooks)) => Some(Arc::new(hooks) as Arc<dyn Lifecycle<S>>),
            (None, None) => None,
        };

        let monitor = match (self.monitor, self.activation) {
            (Some(_), Some(_)) => return Err(BuildError::ConflictingMonitor),
            (Some(monitor), None) => Some(monitor),
            (None, Some(activation)) => Some(Box::new(activation) as Box<dyn Monitor<S>>),
            (None, None) => None,
        };

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };

        Ok(StateRepository::spawn(RepositoryParts {
            name: self.config.name,
            initial,
            lifecycle,
            monitor,
            rules: self.rules,
            policy: self.config.graph_policy,
            history_capacity: self.config.history_capacity,
            runtime,
        }))
    }
}

impl<S: State> Default for RepositoryBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
