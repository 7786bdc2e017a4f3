//! Resolvers used to await terminal states.
//!
//! A resolver is a pure function that maps a state to an optional result.
//! Awaiting callers hold a set of resolvers and finish on the first state for
//! which one of them yields a value.

use super::state::State;
use std::marker::PhantomData;

/// Pure mapping from a state to an optional typed outcome.
///
/// # Example
///
/// ```rust
/// use statecell::core::{Resolver, State};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Job {
///     Queued,
///     Done(u32),
///     Failed,
/// }
///
/// impl State for Job {
///     fn tag(&self) -> &'static str {
///         match self {
///             Self::Queued => "Queued",
///             Self::Done(_) => "Done",
///             Self::Failed => "Failed",
///         }
///     }
///
///     fn allowed_next(&self) -> Vec<&'static str> {
///         match self {
///             Self::Queued => vec!["Done", "Failed"],
///             _ => vec![],
///         }
///     }
/// }
///
/// let finished = Resolver::new(|s: &Job| match s {
///     Job::Done(code) => Some(Ok(*code)),
///     Job::Failed => Some(Err(())),
///     Job::Queued => None,
/// });
///
/// assert_eq!(finished.check(&Job::Queued), None);
/// assert_eq!(finished.check(&Job::Done(7)), Some(Ok(7)));
/// ```
pub struct Resolver<S: State, O> {
    resolve: Box<dyn Fn(&S) -> Option<O> + Send + Sync>,
    _phantom: PhantomData<S>,
}

impl<S: State, O> Resolver<S, O> {
    /// Create a resolver from a pure function.
    pub fn new<F>(resolve: F) -> Self
    where
        F: Fn(&S) -> Option<O> + Send + Sync + 'static,
    {
        Resolver {
            resolve: Box::new(resolve),
            _phantom: PhantomData,
        }
    }

    /// Resolve to a fixed value whenever `predicate` holds.
    pub fn when<P>(predicate: P, value: O) -> Self
    where
        P: Fn(&S) -> bool + Send + Sync + 'static,
        O: Clone + Send + Sync + 'static,
    {
        Self::new(move |state| predicate(state).then(|| value.clone()))
    }

    /// Evaluate the resolver against a state.
    pub fn check(&self, state: &S) -> Option<O> {
        (self.resolve)(state)
    }
}

/// Evaluate resolvers in order, returning the first outcome.
pub(crate) fn first_match<S: State, O>(resolvers: &[Resolver<S, O>], state: &S) -> Option<O> {
    resolvers.iter().find_map(|resolver| resolver.check(state))
}
