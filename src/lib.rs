//! Statecell: observable, concurrency-safe state machines
//!
//! Statecell models a resource whose availability changes asynchronously,
//! such as a runtime permission, a radio, or a location fix, as a single
//! current state that many consumers observe and many producers change.
//! Transition logic stays pure: callers hand the repository a function from
//! the current state to the next one, and the repository applies those
//! functions one at a time, in order, before fanning the result out.
//!
//! # Core Concepts
//!
//! - **State**: a closed set of variants declaring their own edges, via the `State` trait
//! - **Transition functions**: pure `&S -> TransitionOutcome<S>` closures
//! - **Repository**: owns the current state, serializes transitions, runs lifecycle hooks
//! - **Subscriptions**: replay the current state, then every commit, conflating slow readers
//! - **Monitors**: side effects that run only while someone is subscribed
//! - **Resolvers**: turn "wait until the machine settles" into a typed result
//!
//! # Example
//!
//! ```rust
//! use statecell::{RepositoryBuilder, TransitionOutcome};
//! use statecell::state_enum;
//!
//! state_enum! {
//!     pub enum Door {
//!         Closed,
//!         Open,
//!     }
//!     edges: {
//!         Closed => [Open],
//!         Open => [Closed],
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let door = RepositoryBuilder::new()
//!     .name("door")
//!     .initial(Door::Closed)
//!     .on_enter(|state, _| println!("door is now {state:?}"))
//!     .build()
//!     .unwrap();
//!
//! let toggle = |door: &Door| match door {
//!     Door::Closed => TransitionOutcome::To(Door::Open),
//!     Door::Open => TransitionOutcome::To(Door::Closed),
//! };
//! door.transition(toggle).await.unwrap();
//! assert_eq!(door.current_state(), Door::Open);
//! assert_eq!(door.history().len(), 1);
//! # });
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod enforcement;
pub mod permission;
pub mod repository;

// Re-export commonly used types
pub use builder::{BuildError, RepositoryBuilder};
pub use config::{ConfigError, PermissionConfig, RepositoryConfig};
pub use core::{Resolver, State, StateHistory, StateTransition, TransitionOutcome};
pub use enforcement::{EdgeRules, GraphPolicy, GraphViolation};
pub use repository::{
    AwaitOutcome, CancelReason, Dispatcher, Lifecycle, Monitor, StateRepository, Subscription,
    TransitionError, Transitioned,
};
