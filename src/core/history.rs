//! Committed transition history.
//!
//! Every committed transition is recorded as an immutable
//! [`StateTransition`]. A repository keeps the most recent ones in a bounded
//! [`StateHistory`].

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single committed transition.
///
/// # Example
///
/// ```rust
/// use statecell::core::{State, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Scan {
///     Idle,
///     Scanning,
/// }
///
/// impl State for Scan {
///     fn tag(&self) -> &'static str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Scanning => "Scanning",
///         }
///     }
///
///     fn allowed_next(&self) -> Vec<&'static str> {
///         match self {
///             Self::Idle => vec!["Scanning"],
///             Self::Scanning => vec!["Idle"],
///         }
///     }
/// }
///
/// let transition = StateTransition {
///     from: Scan::Idle,
///     to: Scan::Scanning,
///     timestamp: Utc::now(),
///     sequence: 1,
/// };
/// assert_eq!(transition.to.tag(), "Scanning");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being left
    pub from: S,
    /// The state committed as current
    pub to: S,
    /// When the commit happened
    pub timestamp: DateTime<Utc>,
    /// Position in the repository's total commit order, starting at 1
    pub sequence: u64,
}

/// Ordered, optionally bounded history of committed transitions.
///
/// History is immutable: [`record`](StateHistory::record) returns a new
/// history with the transition appended, dropping the oldest entries once the
/// capacity is exceeded.
///
/// # Example
///
/// ```rust
/// use statecell::core::{State, StateHistory, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Step { A, B, C }
///
/// impl State for Step {
///     fn tag(&self) -> &'static str {
///         match self {
///             Self::A => "A",
///             Self::B => "B",
///             Self::C => "C",
///         }
///     }
///
///     fn allowed_next(&self) -> Vec<&'static str> {
///         vec!["A", "B", "C"]
///     }
/// }
///
/// let history = StateHistory::new()
///     .record(StateTransition { from: Step::A, to: Step::B, timestamp: Utc::now(), sequence: 1 })
///     .record(StateTransition { from: Step::B, to: Step::C, timestamp: Utc::now(), sequence: 2 });
///
/// assert_eq!(history.get_path(), vec![&Step::A, &Step::B, &Step::C]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
    capacity: Option<usize>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create a new empty, unbounded history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
            capacity: None,
        }
    }

    /// Create an empty history that keeps at most `capacity` transitions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            transitions: Vec::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, transition: StateTransition<S>) -> Self {
        let mut next = self.clone();
        next.push(transition);
        next
    }

    /// Append a transition in place, dropping the oldest entries over capacity.
    pub fn push(&mut self, transition: StateTransition<S>) {
        if self.capacity == Some(0) {
            return;
        }
        self.transitions.push(transition);
        if let Some(capacity) = self.capacity {
            let overflow = self.transitions.len().saturating_sub(capacity);
            self.transitions.drain(..overflow);
        }
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` state of the oldest retained transition followed by
    /// the `to` state of each transition.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time elapsed between the oldest and newest retained transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Get all retained transitions, oldest first.
    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }

    /// The most recent transition, if any.
    pub fn last(&self) -> Option<&StateTransition<S>> {
        self.transitions.last()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
