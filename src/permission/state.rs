//! Permission states and the pure transition functions between them.

use crate::core::{State, TransitionOutcome};
use crate::permission::platform::PlatformStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid data for a [`Grant`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvalidGrant {
    #[error("Grant expiry {0} lies before the Unix epoch")]
    ExpiryBeforeEpoch(DateTime<Utc>),
}

/// Details of an allowed permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    expires_at: Option<DateTime<Utc>>,
}

impl Grant {
    /// A grant without an expiry.
    pub fn permanent() -> Self {
        Self { expires_at: None }
    }

    /// A grant valid until `expires_at`, such as a one-time permission.
    pub fn until(expires_at: DateTime<Utc>) -> Result<Self, InvalidGrant> {
        if expires_at.timestamp() < 0 {
            return Err(InvalidGrant::ExpiryBeforeEpoch(expires_at));
        }
        Ok(Self {
            expires_at: Some(expires_at),
        })
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Why a permission is not allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Denial {
    /// The platform may still show its request dialog.
    Requestable,
    /// The user chose "don't ask again"; only settings can change it.
    Locked,
}

/// State of one permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    /// Platform status not read yet.
    Unknown,
    /// The platform request is in flight.
    Requesting,
    Allowed(Grant),
    Denied(Denial),
}

impl State for PermissionState {
    fn tag(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Requesting => "Requesting",
            Self::Allowed(_) => "Allowed",
            Self::Denied(Denial::Requestable) => "Denied.Requestable",
            Self::Denied(Denial::Locked) => "Denied.Locked",
        }
    }

    fn allowed_next(&self) -> Vec<&'static str> {
        match self {
            Self::Unknown => vec!["Allowed", "Denied.Requestable", "Denied.Locked"],
            Self::Requesting => vec!["Allowed", "Denied.Requestable", "Denied.Locked"],
            Self::Allowed(_) => vec!["Allowed", "Denied.Requestable", "Denied.Locked"],
            Self::Denied(Denial::Requestable) => vec!["Requesting", "Allowed", "Denied.Locked"],
            Self::Denied(Denial::Locked) => vec!["Allowed", "Denied.Requestable"],
        }
    }
}

/// Final answer of a permission request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    Granted(Grant),
    Denied(Denial),
}

impl RequestOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

impl From<PlatformStatus> for PermissionState {
    fn from(status: PlatformStatus) -> Self {
        match status {
            PlatformStatus::Granted(grant) => Self::Allowed(grant),
            PlatformStatus::NotDetermined => Self::Denied(Denial::Requestable),
            PlatformStatus::Denied { can_ask_again: true } => Self::Denied(Denial::Requestable),
            PlatformStatus::Denied {
                can_ask_again: false,
            } => Self::Denied(Denial::Locked),
        }
    }
}

/// Start a platform request if one can be made.
///
/// Only `Denied.Requestable` moves; every other state remains, which is how a
/// second concurrent request joins the one already in flight.
pub fn begin_request(current: &PermissionState) -> TransitionOutcome<PermissionState> {
    match current {
        PermissionState::Denied(Denial::Requestable) => {
            TransitionOutcome::To(PermissionState::Requesting)
        }
        PermissionState::Unknown
        | PermissionState::Requesting
        | PermissionState::Allowed(_)
        | PermissionState::Denied(Denial::Locked) => TransitionOutcome::Remain,
    }
}

/// Apply a status observed by polling or pushed by the platform.
///
/// While a request is in flight the platform keeps reporting the permission
/// as askable; only a definitive answer leaves `Requesting`.
pub fn on_platform_status(
    current: &PermissionState,
    status: PlatformStatus,
) -> TransitionOutcome<PermissionState> {
    let observed = PermissionState::from(status);
    match current {
        PermissionState::Requesting => match observed {
            PermissionState::Denied(Denial::Requestable) => TransitionOutcome::Remain,
            definitive => TransitionOutcome::To(definitive),
        },
        PermissionState::Unknown | PermissionState::Allowed(_) | PermissionState::Denied(_) => {
            TransitionOutcome::To(observed)
        }
    }
}

/// Apply the platform's answer to the request in flight.
pub fn resolve_request(
    current: &PermissionState,
    status: PlatformStatus,
) -> TransitionOutcome<PermissionState> {
    match current {
        PermissionState::Requesting => TransitionOutcome::To(PermissionState::from(status)),
        PermissionState::Unknown | PermissionState::Allowed(_) | PermissionState::Denied(_) => {
            TransitionOutcome::Remain
        }
    }
}

/// Settle an unreadable status: an unknown permission becomes askable.
pub fn on_status_unavailable(current: &PermissionState) -> TransitionOutcome<PermissionState> {
    match current {
        PermissionState::Unknown => TransitionOutcome::To(PermissionState::Denied(Denial::Requestable)),
        PermissionState::Requesting | PermissionState::Allowed(_) | PermissionState::Denied(_) => {
            TransitionOutcome::Remain
        }
    }
}

/// Map a terminal state to the request's answer.
pub fn request_outcome(state: &PermissionState) -> Option<RequestOutcome> {
    match state {
        PermissionState::Allowed(grant) => Some(RequestOutcome::Granted(*grant)),
        PermissionState::Denied(denial) => Some(RequestOutcome::Denied(*denial)),
        PermissionState::Unknown | PermissionState::Requesting => None,
    }
}
