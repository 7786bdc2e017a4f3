//! Edge rules for the state graph using Validation.

use crate::core::{State, StateHistory, TransitionOutcome};
use crate::enforcement::context::EdgeContext;
use crate::enforcement::violations::GraphViolation;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Type alias for edge check functions
pub type EdgeCheck<S> =
    Box<dyn Fn(&EdgeContext<S>) -> Validation<(), NonEmptyVec<GraphViolation>> + Send + Sync>;

/// Rules every edge of a state graph must satisfy.
///
/// The declared-edge check from [`State::allowed_next`] always runs; custom
/// checks are added with [`require`](EdgeRules::require) and
/// [`require_pred`](EdgeRules::require_pred). All violations are accumulated.
pub struct EdgeRules<S: State> {
    required_checks: Vec<EdgeCheck<S>>,
}

impl<S: State> EdgeRules<S> {
    pub fn new() -> Self {
        Self {
            required_checks: Vec::new(),
        }
    }

    /// Add a custom validation check
    pub fn require<F>(mut self, check: F) -> Self
    where
        F: Fn(&EdgeContext<S>) -> Validation<(), NonEmptyVec<GraphViolation>>
            + Send
            + Sync
            + 'static,
    {
        self.required_checks.push(Box::new(check));
        self
    }

    /// Add a simple predicate check with error message
    pub fn require_pred<F>(mut self, predicate: F, error_msg: String) -> Self
    where
        F: Fn(&EdgeContext<S>) -> bool + Send + Sync + 'static,
    {
        let check = move |ctx: &EdgeContext<S>| {
            if predicate(ctx) {
                Validation::success(())
            } else {
                Validation::fail(GraphViolation::CustomCheckFailed {
                    message: error_msg.clone(),
                })
            }
        };
        self.required_checks.push(Box::new(check));
        self
    }

    /// Enforce all rules on one edge, accumulating ALL violations.
    pub fn enforce(&self, context: &EdgeContext<S>) -> Validation<(), NonEmptyVec<GraphViolation>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<GraphViolation>>> = Vec::new();

        let declared = if context.is_declared() {
            Validation::success(())
        } else {
            Validation::fail(GraphViolation::UndeclaredEdge {
                from: context.from.tag(),
                to: context.to.tag(),
            })
        };
        checks.push(declared);

        for check_fn in &self.required_checks {
            checks.push(check_fn(context));
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Validate what a transition function produced for `from`.
    ///
    /// Remains, and proposals equal to `from`, never violate the graph.
    pub fn check_outcome(
        &self,
        from: &S,
        outcome: &TransitionOutcome<S>,
    ) -> Validation<(), NonEmptyVec<GraphViolation>> {
        match outcome {
            TransitionOutcome::To(next) if next != from => {
                self.enforce(&EdgeContext::new(from.clone(), next.clone()))
            }
            _ => Validation::success(()),
        }
    }

    /// Validate every transition of a recorded history.
    pub fn audit(&self, history: &StateHistory<S>) -> Validation<(), NonEmptyVec<GraphViolation>> {
        let checks = history
            .transitions()
            .iter()
            .map(|transition| self.enforce(&EdgeContext::from(transition)))
            .collect();

        Validation::all_vec(checks).map(|_| ())
    }
}

impl<S: State> Default for EdgeRules<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Render accumulated violations as a single line.
pub(crate) fn describe(violations: &NonEmptyVec<GraphViolation>) -> String {
    violations
        .iter()
        .map(|violation| violation.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateTransition;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Initial,
        Processing,
        Complete,
    }

    impl State for TestState {
        fn tag(&self) -> &'static str {
            match self {
                Self::Initial => "Initial",
                Self::Processing => "Processing",
                Self::Complete => "Complete",
            }
        }

        fn allowed_next(&self) -> Vec<&'static str> {
            match self {
                Self::Initial => vec!["Processing"],
                Self::Processing => vec!["Complete"],
                Self::Complete => vec![],
            }
        }
    }

    #[test]
    fn declared_edge_passes() {
        let rules = EdgeRules::new();
        let context = EdgeContext::new(TestState::Initial, TestState::Processing);

        assert!(rules.enforce(&context).is_success());
    }

    #[test]
    fn enforcement_accumulates_all_violations() {
        let rules = EdgeRules::new()
            .require_pred(|_ctx| false, "Custom check always fails".to_string())
            .require(|ctx: &EdgeContext<TestState>| {
                if matches!(ctx.to, TestState::Complete) {
                    Validation::fail(GraphViolation::CustomCheckFailed {
                        message: "Cannot complete directly".to_string(),
                    })
                } else {
                    Validation::success(())
                }
            });

        let context = EdgeContext::new(TestState::Initial, TestState::Complete);

        match rules.enforce(&context) {
            Validation::Failure(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, GraphViolation::UndeclaredEdge { .. })));
                assert_eq!(
                    errors
                        .iter()
                        .filter(|e| matches!(e, GraphViolation::CustomCheckFailed { .. }))
                        .count(),
                    2
                );
            }
            Validation::Success(_) => panic!("Expected failures, got success"),
        }
    }

    #[test]
    fn check_outcome_ignores_remain_and_equal_targets() {
        let rules = EdgeRules::new();

        assert!(rules
            .check_outcome(&TestState::Complete, &TransitionOutcome::Remain)
            .is_success());
        assert!(rules
            .check_outcome(
                &TestState::Complete,
                &TransitionOutcome::To(TestState::Complete)
            )
            .is_success());
        assert!(rules
            .check_outcome(
                &TestState::Complete,
                &TransitionOutcome::To(TestState::Initial)
            )
            .is_failure());
    }

    #[test]
    fn audit_reports_every_bad_transition() {
        let history = StateHistory::new()
            .record(StateTransition {
                from: TestState::Initial,
                to: TestState::Complete,
                timestamp: Utc::now(),
                sequence: 1,
            })
            .record(StateTransition {
                from: TestState::Complete,
                to: TestState::Initial,
                timestamp: Utc::now(),
                sequence: 2,
            });

        let result = EdgeRules::new().audit(&history);
        if let Validation::Failure(errors) = result {
            assert_eq!(errors.len(), 2);
            assert!(describe(&errors).contains("'Complete' -> 'Initial'"));
        } else {
            panic!("Expected failures, got success");
        }
    }

    #[test]
    fn audit_of_empty_history_succeeds() {
        let history: StateHistory<TestState> = StateHistory::new();
        assert!(EdgeRules::new().audit(&history).is_success());
    }
}
