//! Builder API for repository construction.
//!
//! This module provides a fluent builder for [`StateRepository`] and the
//! [`state_enum!`](crate::state_enum) macro for declaring state graphs with
//! minimal boilerplate.
//!
//! [`StateRepository`]: crate::repository::StateRepository

pub mod error;
pub mod macros;
pub mod repository;

pub use error::BuildError;
pub use repository::RepositoryBuilder;
