//! Transition errors and results.

use crate::core::{State, StateTransition};
use thiserror::Error;

/// Errors a transition caller can receive from the executor.
///
/// None of these are ever broadcast; subscribers only see committed states.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransitionError {
    #[error("State repository '{repository}' is closed")]
    Closed { repository: String },

    #[error("Transition function panicked in '{repository}': {message}")]
    Panicked { repository: String, message: String },

    #[error("Edge '{from}' -> '{to}' rejected in '{repository}': {reasons}")]
    EdgeRejected {
        repository: String,
        from: &'static str,
        to: &'static str,
        reasons: String,
    },
}

/// Errors from [`try_transition`](crate::repository::StateRepository::try_transition).
#[derive(Debug, Error)]
pub enum TryTransitionError<E: std::error::Error + 'static> {
    /// The transition function itself failed; the state is unchanged.
    #[error("Transition function failed: {0}")]
    Rejected(#[source] E),

    #[error(transparent)]
    Executor(#[from] TransitionError),
}

/// What the executor did with a transition request.
#[derive(Clone, Debug, PartialEq)]
pub enum Transitioned<S: State> {
    /// A new state was committed.
    Moved(StateTransition<S>),
    /// Nothing changed; carries the state the function observed.
    Remained(S),
}

impl<S: State> Transitioned<S> {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved(_))
    }

    /// The state current right after the request was applied.
    pub fn state(&self) -> &S {
        match self {
            Self::Moved(transition) => &transition.to,
            Self::Remained(state) => state,
        }
    }
}
