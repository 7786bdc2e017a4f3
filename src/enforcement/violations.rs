//! Graph violations and the runtime policy applied to them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A reason why a proposed edge breaks the state graph.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphViolation {
    #[error("Edge '{from}' -> '{to}' is not declared by '{from}'")]
    UndeclaredEdge {
        from: &'static str,
        to: &'static str,
    },

    #[error("Custom check failed: {message}")]
    CustomCheckFailed { message: String },
}

/// How a repository reacts to a committed edge that violates the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphPolicy {
    /// Skip validation entirely
    Trust,

    /// Commit anyway but log a warning
    #[default]
    Warn,

    /// Reject the transition; the state stays unchanged
    Enforce,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_messages_name_the_edge() {
        let violation = GraphViolation::UndeclaredEdge {
            from: "Allowed",
            to: "Requesting",
        };
        assert_eq!(
            violation.to_string(),
            "Edge 'Allowed' -> 'Requesting' is not declared by 'Allowed'"
        );
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        let policy: GraphPolicy = serde_json::from_str("\"enforce\"").unwrap();
        assert_eq!(policy, GraphPolicy::Enforce);
        assert_eq!(GraphPolicy::default(), GraphPolicy::Warn);
    }
}
