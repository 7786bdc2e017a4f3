//! Permission Flow
//!
//! This example negotiates runtime permissions against a simulated platform.
//!
//! Key concepts:
//! - Implementing `PermissionPlatform` for a host
//! - Concurrent requests sharing a single platform dialog
//! - A lock reported by the platform denying without asking
//! - One negotiator per permission kind in a `Permissions` registry
//!
//! Run with: cargo run --example permission_flow

use async_trait::async_trait;
use statecell::permission::{
    Grant, PermissionKind, PermissionPlatform, Permissions, PlatformError, PlatformStatus,
};
use statecell::PermissionConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Grants the camera after a short "dialog", keeps the microphone locked.
#[derive(Default)]
struct SimulatedPlatform {
    dialogs: AtomicUsize,
}

#[async_trait]
impl PermissionPlatform for SimulatedPlatform {
    async fn status(&self, kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
        match kind {
            PermissionKind::Microphone => Ok(PlatformStatus::Denied {
                can_ask_again: false,
            }),
            _ => Ok(PlatformStatus::NotDetermined),
        }
    }

    async fn request(&self, kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
        self.dialogs.fetch_add(1, Ordering::SeqCst);
        println!("  [platform] showing dialog for {kind}");
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(PlatformStatus::Granted(Grant::permanent()))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("=== Permission Flow Example ===\n");

    let platform = Arc::new(SimulatedPlatform::default());
    let permissions = Permissions::new(Arc::clone(&platform), PermissionConfig::default()).unwrap();
    let permissions = Arc::new(permissions);

    println!("Three screens ask for the camera at once:");
    let screens: Vec<_> = (1..=3)
        .map(|screen| {
            let permissions = Arc::clone(&permissions);
            tokio::spawn(async move {
                let outcome = permissions.request(&PermissionKind::Camera).await;
                println!("  screen {screen}: {outcome:?}");
            })
        })
        .collect();
    for screen in screens {
        screen.await.unwrap();
    }
    println!(
        "  dialogs shown: {}\n",
        platform.dialogs.load(Ordering::SeqCst)
    );

    println!("Asking for the microphone, locked in settings:");
    let outcome = permissions.request(&PermissionKind::Microphone).await;
    println!("  {outcome:?}");
    println!(
        "  dialogs shown: {}\n",
        platform.dialogs.load(Ordering::SeqCst)
    );

    println!("Current states:");
    for kind in [PermissionKind::Camera, PermissionKind::Microphone] {
        println!("  {kind}: {:?}", permissions.state(&kind));
    }

    permissions.close();
    println!("\n=== Example Complete ===");
}
