//! Result of a transition function.

use super::state::State;

/// What a transition function decided for the current state.
///
/// `Remain` means no change and no broadcast. `To` proposes a new state; the
/// executor still treats it as a remain when it equals the current one.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionOutcome<S: State> {
    /// Keep the current state.
    Remain,
    /// Move to the given state.
    To(S),
}

impl<S: State> TransitionOutcome<S> {
    /// Move to `next` only if `current` declares the edge, otherwise remain.
    pub fn to_if_allowed(current: &S, next: S) -> Self {
        if current.can_transition_to(&next) {
            Self::To(next)
        } else {
            Self::Remain
        }
    }

    /// Resolve the outcome against `current`, conflating equal values.
    ///
    /// Returns the state to commit, or `None` for a remain.
    pub fn resolve(self, current: &S) -> Option<S> {
        match self {
            Self::Remain => None,
            Self::To(next) if next == *current => None,
            Self::To(next) => Some(next),
        }
    }

    pub fn is_remain(&self) -> bool {
        matches!(self, Self::Remain)
    }
}
