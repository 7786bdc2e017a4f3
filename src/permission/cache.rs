//! Injectable memory of which permissions were requested.
//!
//! Some platforms report a permission that was never requested the same way
//! as one the user locked with "don't ask again". [`CachedPlatform`] uses a
//! [`PermissionCache`] to tell the two apart. The cache lives exactly as long
//! as the `Arc`s handed out by whoever constructs the platform; nothing in
//! this crate keeps one globally.

use crate::permission::platform::{PermissionKind, PermissionPlatform, PlatformError, PlatformStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    requested: bool,
    last: Option<PlatformStatus>,
}

/// Requested kinds and the last status seen for each.
#[derive(Debug, Default)]
pub struct PermissionCache {
    entries: RwLock<HashMap<PermissionKind, Entry>>,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that the request dialog was shown for `kind`.
    pub fn mark_requested(&self, kind: &PermissionKind) {
        self.update(kind, |entry| entry.requested = true);
    }

    pub fn was_requested(&self, kind: &PermissionKind) -> bool {
        self.entry(kind).is_some_and(|entry| entry.requested)
    }

    pub fn record(&self, kind: &PermissionKind, status: PlatformStatus) {
        self.update(kind, |entry| entry.last = Some(status));
    }

    /// Last status recorded for `kind`, if any.
    pub fn last(&self, kind: &PermissionKind) -> Option<PlatformStatus> {
        self.entry(kind).and_then(|entry| entry.last)
    }

    /// Forget everything, e.g. after the app's data was reset.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn entry(&self, kind: &PermissionKind) -> Option<Entry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .copied()
    }

    fn update(&self, kind: &PermissionKind, change: impl FnOnce(&mut Entry)) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        change(entries.entry(kind.clone()).or_default());
    }
}

/// Platform wrapper that reads "locked" for a never-requested kind as
/// "not determined".
pub struct CachedPlatform<P> {
    inner: P,
    cache: Arc<PermissionCache>,
}

impl<P: PermissionPlatform> CachedPlatform<P> {
    pub fn new(inner: P, cache: Arc<PermissionCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<PermissionCache> {
        &self.cache
    }

    fn interpret(&self, kind: &PermissionKind, status: PlatformStatus) -> PlatformStatus {
        match status {
            PlatformStatus::Denied {
                can_ask_again: false,
            } if !self.cache.was_requested(kind) => {
                trace!(permission = %kind, "Never requested; treating lock as not determined");
                PlatformStatus::NotDetermined
            }
            other => other,
        }
    }
}

#[async_trait]
impl<P: PermissionPlatform> PermissionPlatform for CachedPlatform<P> {
    async fn status(&self, kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
        let status = self.interpret(kind, self.inner.status(kind).await?);
        self.cache.record(kind, status);
        Ok(status)
    }

    async fn request(&self, kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
        self.cache.mark_requested(kind);
        let status = self.inner.request(kind).await?;
        self.cache.record(kind, status);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::state::Grant;

    struct Fixed(PlatformStatus);

    #[async_trait]
    impl PermissionPlatform for Fixed {
        async fn status(&self, _kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
            Ok(self.0)
        }

        async fn request(&self, _kind: &PermissionKind) -> Result<PlatformStatus, PlatformError> {
            Ok(self.0)
        }
    }

    const LOCKED: PlatformStatus = PlatformStatus::Denied {
        can_ask_again: false,
    };

    #[tokio::test]
    async fn unrequested_lock_reads_as_not_determined() {
        let cache = Arc::new(PermissionCache::new());
        let platform = CachedPlatform::new(Fixed(LOCKED), Arc::clone(&cache));

        let status = platform.status(&PermissionKind::Camera).await.unwrap();
        assert_eq!(status, PlatformStatus::NotDetermined);
        assert_eq!(cache.last(&PermissionKind::Camera), Some(PlatformStatus::NotDetermined));
    }

    #[tokio::test]
    async fn lock_after_request_is_kept() {
        let cache = Arc::new(PermissionCache::new());
        let platform = CachedPlatform::new(Fixed(LOCKED), Arc::clone(&cache));

        assert_eq!(platform.request(&PermissionKind::Camera).await.unwrap(), LOCKED);
        assert!(cache.was_requested(&PermissionKind::Camera));
        assert_eq!(platform.status(&PermissionKind::Camera).await.unwrap(), LOCKED);

        // Other kinds are tracked separately.
        assert_eq!(
            platform.status(&PermissionKind::Microphone).await.unwrap(),
            PlatformStatus::NotDetermined
        );
    }

    #[tokio::test]
    async fn grants_pass_through_and_clear_forgets() {
        let cache = Arc::new(PermissionCache::new());
        let granted = PlatformStatus::Granted(Grant::permanent());
        let platform = CachedPlatform::new(Fixed(granted), Arc::clone(&cache));

        assert_eq!(platform.request(&PermissionKind::Notifications).await.unwrap(), granted);
        assert_eq!(cache.last(&PermissionKind::Notifications), Some(granted));

        cache.clear();
        assert!(!cache.was_requested(&PermissionKind::Notifications));
        assert_eq!(cache.last(&PermissionKind::Notifications), None);
    }
}
