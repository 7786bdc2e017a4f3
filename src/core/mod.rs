//! Core state types.
//!
//! This module contains the pure part of the crate:
//! - State definitions via the `State` trait
//! - Transition outcomes returned by transition functions
//! - Resolvers used to await terminal states
//! - Immutable history of committed transitions
//!
//! Nothing here performs I/O or touches shared state.

mod history;
mod outcome;
mod resolver;
mod state;

pub use history::{StateHistory, StateTransition};
pub use outcome::TransitionOutcome;
pub(crate) use resolver::first_match;
pub use resolver::Resolver;
pub use state::State;
