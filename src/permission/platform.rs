//! Boundary to the platform that actually owns permissions.

use crate::permission::state::Grant;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A permission the platform can grant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Camera,
    Microphone,
    Location { background: bool, precise: bool },
    Bluetooth { scan: bool, connect: bool },
    Notifications,
    Contacts { write: bool },
    Calendar { write: bool },
    Storage { write: bool },
    Custom(String),
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Microphone => write!(f, "microphone"),
            Self::Location { background, precise } => write!(
                f,
                "location{}{}",
                if *background { ".background" } else { "" },
                if *precise { ".precise" } else { "" }
            ),
            Self::Bluetooth { scan, connect } => write!(
                f,
                "bluetooth{}{}",
                if *scan { ".scan" } else { "" },
                if *connect { ".connect" } else { "" }
            ),
            Self::Notifications => write!(f, "notifications"),
            Self::Contacts { write: true } => write!(f, "contacts.write"),
            Self::Contacts { write: false } => write!(f, "contacts"),
            Self::Calendar { write: true } => write!(f, "calendar.write"),
            Self::Calendar { write: false } => write!(f, "calendar"),
            Self::Storage { write: true } => write!(f, "storage.write"),
            Self::Storage { write: false } => write!(f, "storage"),
            Self::Custom(name) => write!(f, "custom.{name}"),
        }
    }
}

/// What the platform reports for a permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformStatus {
    Granted(Grant),
    /// The user has never been asked.
    NotDetermined,
    Denied { can_ask_again: bool },
}

/// Failures talking to the platform.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    #[error("Permission '{0}' is not declared by the application")]
    NotDeclared(PermissionKind),

    #[error("Permission '{0}' is not supported on this platform")]
    Unsupported(PermissionKind),

    #[error("Platform call failed: {0}")]
    Failed(String),
}

/// Platform permission API.
///
/// `status` must not prompt the user; `request` may show a dialog and
/// resolves once the user has answered. Both may be called from any task.
#[async_trait]
pub trait PermissionPlatform: Send + Sync + 'static {
    async fn status(&self, kind: &PermissionKind) -> Result<PlatformStatus, PlatformError>;

    async fn request(&self, kind: &PermissionKind) -> Result<PlatformStatus, PlatformError>;
}

#[async_trait]
impl<P: PermissionPlatform + ?Sized> PermissionPlatform for Arc<P> {
    async fn status(&self, kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
        (**self).status(kind).await
    }

    async fn request(&self, kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
        (**self).request(kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_render_as_dotted_names() {
        assert_eq!(PermissionKind::Camera.to_string(), "camera");
        assert_eq!(
            PermissionKind::Location {
                background: true,
                precise: false
            }
            .to_string(),
            "location.background"
        );
        assert_eq!(
            PermissionKind::Bluetooth {
                scan: true,
                connect: true
            }
            .to_string(),
            "bluetooth.scan.connect"
        );
        assert_eq!(
            PermissionKind::Custom("health".to_string()).to_string(),
            "custom.health"
        );
    }

    #[test]
    fn kinds_serialize_for_config_files() {
        let json = serde_json::to_string(&PermissionKind::Storage { write: true }).unwrap();
        let kind: PermissionKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, PermissionKind::Storage { write: true });
    }
}
