//! One negotiator per permission kind, created on first use.

use crate::config::PermissionConfig;
use crate::permission::negotiator::{PermissionError, PermissionNegotiator};
use crate::permission::platform::{PermissionKind, PermissionPlatform};
use crate::permission::state::{PermissionState, RequestOutcome};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Registry of negotiators sharing one platform.
pub struct Permissions<P: PermissionPlatform> {
    platform: Arc<P>,
    config: PermissionConfig,
    negotiators: Mutex<HashMap<PermissionKind, PermissionNegotiator>>,
}

impl<P: PermissionPlatform> Permissions<P> {
    pub fn new(platform: Arc<P>, config: PermissionConfig) -> Result<Self, PermissionError> {
        config.validate()?;
        Ok(Self {
            platform,
            config,
            negotiators: Mutex::new(HashMap::new()),
        })
    }

    fn negotiators(&self) -> MutexGuard<'_, HashMap<PermissionKind, PermissionNegotiator>> {
        self.negotiators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The negotiator for `kind`, creating it if needed.
    ///
    /// A negotiator that was closed on its own is replaced.
    pub fn get(&self, kind: &PermissionKind) -> Result<PermissionNegotiator, PermissionError> {
        let mut negotiators = self.negotiators();
        if let Some(negotiator) = negotiators.get(kind).filter(|n| !n.is_closed()) {
            return Ok(negotiator.clone());
        }

        let negotiator =
            PermissionNegotiator::new(kind.clone(), Arc::clone(&self.platform), &self.config)?;
        debug!(permission = %kind, "Negotiator created");
        negotiators.insert(kind.clone(), negotiator.clone());
        Ok(negotiator)
    }

    pub async fn request(&self, kind: &PermissionKind) -> Result<RequestOutcome, PermissionError> {
        let negotiator = self.get(kind)?;
        negotiator.request().await
    }

    /// Current state of `kind`, or `None` if it was never used.
    pub fn state(&self, kind: &PermissionKind) -> Option<PermissionState> {
        self.negotiators().get(kind).map(PermissionNegotiator::state)
    }

    pub fn len(&self) -> usize {
        self.negotiators().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close and forget every negotiator.
    pub fn close(&self) {
        let negotiators: Vec<_> = self.negotiators().drain().map(|(_, n)| n).collect();
        for negotiator in negotiators {
            negotiator.close();
        }
    }
}

impl<P: PermissionPlatform> Drop for Permissions<P> {
    fn drop(&mut self) {
        self.close();
    }
}
