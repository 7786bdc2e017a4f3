//! Replay-1, conflated subscriptions to a repository's state.

use crate::core::State;
use crate::repository::activation::Activation;
use futures::stream::{self, Stream};
use std::sync::Arc;
use tokio::sync::watch;

/// A live view of a repository's state.
///
/// The first call to [`next`](Subscription::next) yields the state that was
/// current when the subscription was created. Later calls yield committed
/// states in commit order; a subscriber that falls behind skips straight to
/// the latest unread value. The executor never waits for subscribers.
///
/// Dropping the subscription unsubscribes it.
pub struct Subscription<S: State> {
    receiver: watch::Receiver<S>,
    replay: Option<S>,
    activation: Option<Arc<Activation<S>>>,
}

impl<S: State> Subscription<S> {
    pub(crate) fn new(snapshot: &watch::Receiver<S>, activation: Arc<Activation<S>>) -> Self {
        let mut receiver = snapshot.clone();
        let replay = receiver.borrow_and_update().clone();
        activation.acquire();
        Self {
            receiver,
            replay: Some(replay),
            activation: Some(activation),
        }
    }

    /// Wait for the next state.
    ///
    /// Returns `None` once unsubscribed or after the repository is torn down.
    pub async fn next(&mut self) -> Option<S> {
        self.activation.as_ref()?;
        if let Some(state) = self.replay.take() {
            return Some(state);
        }
        match self.receiver.changed().await {
            Ok(()) => Some(self.receiver.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Latest committed state, without consuming it.
    pub fn current(&self) -> S {
        self.receiver.borrow().clone()
    }

    /// Stop receiving states. Calling it again has no effect.
    pub fn unsubscribe(&mut self) {
        if let Some(activation) = self.activation.take() {
            activation.release();
        }
        self.replay = None;
    }

    pub fn is_subscribed(&self) -> bool {
        self.activation.is_some()
    }

    /// Adapt this subscription into a [`Stream`] of states.
    pub fn into_stream(self) -> impl Stream<Item = S> + Send + Unpin {
        Box::pin(stream::unfold(self, |mut subscription| async move {
            subscription
                .next()
                .await
                .map(|state| (state, subscription))
        }))
    }
}

impl<S: State> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
