//! Context provided to edge checks.

use crate::core::{State, StateTransition};

/// A proposed or committed edge between two states
#[derive(Clone, Debug)]
pub struct EdgeContext<S: State> {
    pub from: S,
    pub to: S,
}

impl<S: State> EdgeContext<S> {
    pub fn new(from: S, to: S) -> Self {
        Self { from, to }
    }

    /// Whether the source state declares the target's tag (pure)
    pub fn is_declared(&self) -> bool {
        self.from.can_transition_to(&self.to)
    }
}

impl<S: State> From<&StateTransition<S>> for EdgeContext<S> {
    fn from(transition: &StateTransition<S>) -> Self {
        Self {
            from: transition.from.clone(),
            to: transition.to.clone(),
        }
    }
}
