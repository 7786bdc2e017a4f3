//! Macros for declaring state graphs.

/// Declare a unit-variant state enum together with its edges.
///
/// Generates the enum (deriving `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`,
/// `Debug` and serde) and its [`State`](crate::core::State) implementation.
/// Variants without an `edges` entry have no successors.
///
/// # Example
///
/// ```
/// use statecell::core::State;
/// use statecell::state_enum;
///
/// state_enum! {
///     pub enum Connection {
///         Disconnected,
///         Connecting,
///         Connected,
///     }
///     edges: {
///         Disconnected => [Connecting],
///         Connecting => [Connected, Disconnected],
///         Connected => [Disconnected],
///     }
/// }
///
/// assert_eq!(Connection::Connecting.tag(), "Connecting");
/// assert!(Connection::Disconnected.can_transition_to(&Connection::Connecting));
/// assert!(!Connection::Disconnected.can_transition_to(&Connection::Connected));
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(edges: {
            $($from:ident => [$($to:ident),* $(,)?]),* $(,)?
        })?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn tag(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            #[allow(unreachable_patterns)]
            fn allowed_next(&self) -> Vec<&'static str> {
                match self {
                    $($(Self::$from => vec![$(stringify!($to)),*],)*)?
                    _ => Vec::new(),
                }
            }
        }
    };
}
