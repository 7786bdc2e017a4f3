//! Status polling for platforms without change notifications.

use crate::permission::platform::{PermissionKind, PermissionPlatform};
use crate::permission::state::{on_platform_status, on_status_unavailable, PermissionState};
use crate::repository::{Dispatcher, Monitor};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Polls the platform status of one permission while anyone is subscribed.
///
/// Each observation is dispatched as [`on_platform_status`]; a failed poll is
/// dispatched as [`on_status_unavailable`] so that `Unknown` still settles.
/// An observation is dropped if anything was committed while it was being
/// read, since a request answered in the meantime is newer than the read.
/// Polling ends on `stop` or once the repository is gone.
pub struct PollingMonitor<P> {
    kind: PermissionKind,
    platform: Arc<P>,
    interval: Duration,
    running: Mutex<Option<CancellationToken>>,
}

impl<P: PermissionPlatform> PollingMonitor<P> {
    pub fn new(kind: PermissionKind, platform: Arc<P>, interval: Duration) -> Self {
        Self {
            kind,
            platform,
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn is_polling(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<P: PermissionPlatform> Monitor<PermissionState> for PollingMonitor<P> {
    fn start(&self, dispatcher: Dispatcher<PermissionState>) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return;
        }

        let stop = CancellationToken::new();
        *running = Some(stop.clone());
        debug!(permission = %self.kind, interval_ms = self.interval.as_millis() as u64, "Polling started");

        let runtime = dispatcher.runtime().clone();
        runtime.spawn(poll(
            self.kind.clone(),
            Arc::clone(&self.platform),
            self.interval,
            dispatcher,
            stop,
        ));
    }

    fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(stop) = running {
            stop.cancel();
        }
    }
}

async fn poll<P: PermissionPlatform>(
    kind: PermissionKind,
    platform: Arc<P>,
    interval: Duration,
    dispatcher: Dispatcher<PermissionState>,
    stop: CancellationToken,
) {
    loop {
        let seen = dispatcher.sequence();
        let observed = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            observed = platform.status(&kind) => observed,
        };

        let dispatched = match observed {
            Ok(status) => dispatcher
                .dispatch_unless_moved(seen, move |current| on_platform_status(current, status)),
            Err(err) => {
                warn!(permission = %kind, error = %err, "Permission status unavailable");
                dispatcher.dispatch_unless_moved(seen, on_status_unavailable)
            }
        };
        if dispatched.is_err() {
            break;
        }

        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!(permission = %kind, repository = dispatcher.repository(), "Polling stopped");
}
