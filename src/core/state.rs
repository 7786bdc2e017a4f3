//! Core State trait for repository states.
//!
//! A state is an immutable value drawn from a closed set of variants. Each
//! variant carries a stable tag and declares which variants it may move to.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Trait for states held by a [`StateRepository`](crate::repository::StateRepository).
///
/// All methods are pure. States are snapshots: the repository hands out
/// clones and never mutates a committed value in place.
///
/// # Required Traits
///
/// - `Clone`: subscribers and history receive their own copies
/// - `PartialEq`: a transition to an equal value is conflated into a remain
/// - `Debug`: states show up in logs and test failures
/// - `Serialize` + `DeserializeOwned`: histories can be exported
///
/// # Example
///
/// ```rust
/// use statecell::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Radio {
///     Off,
///     Scanning { found: Vec<String> },
///     Connected(String),
/// }
///
/// impl State for Radio {
///     fn tag(&self) -> &'static str {
///         match self {
///             Self::Off => "Off",
///             Self::Scanning { .. } => "Scanning",
///             Self::Connected(_) => "Connected",
///         }
///     }
///
///     fn allowed_next(&self) -> Vec<&'static str> {
///         match self {
///             Self::Off => vec!["Scanning"],
///             Self::Scanning { .. } => vec!["Off", "Scanning", "Connected"],
///             Self::Connected(_) => vec!["Off"],
///         }
///     }
/// }
///
/// let scanning = Radio::Scanning { found: vec![] };
/// assert!(Radio::Off.can_transition_to(&scanning));
/// assert!(!Radio::Off.can_transition_to(&Radio::Connected("beacon".into())));
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Stable identifier of this value's variant, used in logs and edge checks.
    fn tag(&self) -> &'static str;

    /// Tags of the variants this variant may transition into.
    ///
    /// A variant whose payload may change in place lists its own tag.
    fn allowed_next(&self) -> Vec<&'static str>;

    /// Check whether `next` is a declared successor of this state.
    fn can_transition_to(&self, next: &Self) -> bool {
        self.allowed_next().contains(&next.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum Link {
        Idle,
        Discovering(Vec<String>),
        Connected { peer: String },
    }

    impl State for Link {
        fn tag(&self) -> &'static str {
            match self {
                Self::Idle => "Idle",
                Self::Discovering(_) => "Discovering",
                Self::Connected { .. } => "Connected",
            }
        }

        fn allowed_next(&self) -> Vec<&'static str> {
            match self {
                Self::Idle => vec!["Discovering"],
                Self::Discovering(_) => vec!["Idle", "Discovering", "Connected"],
                Self::Connected { .. } => vec!["Idle"],
            }
        }
    }

    #[test]
    fn tag_ignores_payload() {
        assert_eq!(Link::Discovering(vec![]).tag(), "Discovering");
        assert_eq!(
            Link::Discovering(vec!["a".to_string()]).tag(),
            Link::Discovering(vec![]).tag()
        );
    }

    #[test]
    fn can_transition_follows_declared_edges() {
        let discovering = Link::Discovering(vec![]);
        let connected = Link::Connected {
            peer: "p1".to_string(),
        };

        assert!(Link::Idle.can_transition_to(&discovering));
        assert!(!Link::Idle.can_transition_to(&connected));
        assert!(discovering.can_transition_to(&connected));
        assert!(connected.can_transition_to(&Link::Idle));
    }

    #[test]
    fn self_edges_must_be_declared() {
        let a = Link::Discovering(vec![]);
        let b = Link::Discovering(vec!["peer".to_string()]);
        assert!(a.can_transition_to(&b));

        let c = Link::Connected {
            peer: "x".to_string(),
        };
        let d = Link::Connected {
            peer: "y".to_string(),
        };
        assert!(!c.can_transition_to(&d));
    }

    #[test]
    fn equality_includes_payload() {
        assert_eq!(Link::Discovering(vec![]), Link::Discovering(vec![]));
        assert_ne!(
            Link::Discovering(vec![]),
            Link::Discovering(vec!["a".to_string()])
        );
    }

    #[test]
    fn state_serializes_correctly() {
        let state = Link::Connected {
            peer: "headset".to_string(),
        };
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: Link = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
