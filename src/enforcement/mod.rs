//! Validation of state-graph edges.
//!
//! Every state declares its successors through
//! [`State::allowed_next`](crate::core::State::allowed_next). The rules in this
//! module check committed or proposed edges against those declarations, plus
//! any custom checks, using Stillwater's `Validation` so that all violations
//! are reported together.
//!
//! Repositories apply the rules at commit time according to their
//! [`GraphPolicy`]; tests use [`EdgeRules::check_outcome`] and
//! [`EdgeRules::audit`] to prove transition functions stay inside the graph.
//!
//! # Example
//!
//! ```rust
//! use statecell::enforcement::{EdgeContext, EdgeRules};
//! use statecell::state_enum;
//!
//! state_enum! {
//!     enum Light {
//!         Red,
//!         Green,
//!         Yellow,
//!     }
//!     edges: {
//!         Red => [Green],
//!         Green => [Yellow],
//!         Yellow => [Red],
//!     }
//! }
//!
//! let rules: EdgeRules<Light> = EdgeRules::new();
//! assert!(rules.enforce(&EdgeContext::new(Light::Red, Light::Green)).is_success());
//! assert!(rules.enforce(&EdgeContext::new(Light::Red, Light::Yellow)).is_failure());
//! ```

pub mod context;
pub mod rules;
pub mod violations;

pub use context::EdgeContext;
pub(crate) use rules::describe;
pub use rules::{EdgeCheck, EdgeRules};
pub use violations::{GraphPolicy, GraphViolation};
