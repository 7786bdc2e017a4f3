//! Subscriber-driven activation of monitoring side effects.

use crate::core::State;
use crate::repository::dispatcher::Dispatcher;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// External monitoring tied to "is anyone watching".
///
/// `start` runs when the first subscriber appears and `stop` when the last one
/// leaves. Calls never overlap, and `stop` only follows a `start`.
/// Implementations should still tolerate repeated calls.
///
/// Both run while the subscriber gate is locked. They must not subscribe to
/// the same repository or drop one of its subscriptions, which would
/// deadlock; spawn a task for that and use the [`Dispatcher`] for
/// everything synchronous.
pub trait Monitor<S: State>: Send + Sync + 'static {
    fn start(&self, dispatcher: Dispatcher<S>);

    fn stop(&self);
}

type StartFn<S> = Box<dyn Fn(Dispatcher<S>) + Send + Sync>;
type StopFn = Box<dyn Fn() + Send + Sync>;

/// Monitor built from a start and a stop closure.
pub struct FnMonitor<S: State> {
    start: Option<StartFn<S>>,
    stop: Option<StopFn>,
}

impl<S: State> FnMonitor<S> {
    pub fn new() -> Self {
        Self {
            start: None,
            stop: None,
        }
    }

    pub fn on_start<F>(mut self, start: F) -> Self
    where
        F: Fn(Dispatcher<S>) + Send + Sync + 'static,
    {
        self.start = Some(Box::new(start));
        self
    }

    pub fn on_stop<F>(mut self, stop: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.stop = Some(Box::new(stop));
        self
    }
}

impl<S: State> Default for FnMonitor<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> Monitor<S> for FnMonitor<S> {
    fn start(&self, dispatcher: Dispatcher<S>) {
        if let Some(start) = &self.start {
            start(dispatcher);
        }
    }

    fn stop(&self) {
        if let Some(stop) = &self.stop {
            stop();
        }
    }
}

#[derive(Debug, Default)]
struct Gate {
    subscribers: usize,
    active: bool,
    closed: bool,
}

/// Counts subscribers and drives the monitor on the 0 -> 1 and 1 -> 0 edges.
///
/// The count update and the monitor call happen under the same lock, so a
/// subscriber arriving while `stop` runs waits for it and then starts the
/// monitor again.
pub(crate) struct Activation<S: State> {
    repository: String,
    gate: Mutex<Gate>,
    monitor: Option<Box<dyn Monitor<S>>>,
    dispatcher: Dispatcher<S>,
}

impl<S: State> Activation<S> {
    pub(crate) fn new(
        repository: String,
        monitor: Option<Box<dyn Monitor<S>>>,
        dispatcher: Dispatcher<S>,
    ) -> Self {
        Self {
            repository,
            gate: Mutex::new(Gate::default()),
            monitor,
            dispatcher,
        }
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn acquire(&self) {
        let mut gate = self.gate();
        gate.subscribers += 1;
        if gate.subscribers == 1 && !gate.active && !gate.closed {
            if let Some(monitor) = &self.monitor {
                debug!(repository = %self.repository, "Starting monitor");
                monitor.start(self.dispatcher.clone());
            }
            gate.active = true;
        }
    }

    pub(crate) fn release(&self) {
        let mut gate = self.gate();
        gate.subscribers = gate.subscribers.saturating_sub(1);
        if gate.subscribers == 0 && gate.active {
            Self::deactivate(&self.repository, self.monitor.as_deref(), &mut gate);
        }
    }

    /// Stop an active monitor and refuse further starts.
    pub(crate) fn shutdown(&self) {
        let mut gate = self.gate();
        gate.closed = true;
        if gate.active {
            Self::deactivate(&self.repository, self.monitor.as_deref(), &mut gate);
        }
    }

    fn deactivate(repository: &str, monitor: Option<&dyn Monitor<S>>, gate: &mut Gate) {
        if let Some(monitor) = monitor {
            debug!(repository = %repository, "Stopping monitor");
            monitor.stop();
        }
        gate.active = false;
    }

    pub(crate) fn subscribers(&self) -> usize {
        self.gate().subscribers
    }

    pub(crate) fn is_active(&self) -> bool {
        self.gate().active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    struct Level(u8);

    impl State for Level {
        fn tag(&self) -> &'static str {
            "Level"
        }

        fn allowed_next(&self) -> Vec<&'static str> {
            vec!["Level"]
        }
    }

    fn counting_activation() -> (Activation<Level>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let monitor = FnMonitor::new()
            .on_start({
                let starts = Arc::clone(&starts);
                move |_| {
                    starts.fetch_add(1, Ordering::SeqCst);
                }
            })
            .on_stop({
                let stops = Arc::clone(&stops);
                move || {
                    stops.fetch_add(1, Ordering::SeqCst);
                }
            });

        let (sender, _receiver) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            sender.downgrade(),
            Arc::from("level"),
            tokio::runtime::Handle::current(),
        );
        let activation = Activation::new("level".to_string(), Some(Box::new(monitor)), dispatcher);
        (activation, starts, stops)
    }

    #[tokio::test]
    async fn start_runs_once_per_active_period() {
        let (activation, starts, stops) = counting_activation();

        activation.acquire();
        activation.acquire();
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        activation.release();
        assert_eq!(stops.load(Ordering::SeqCst), 0);
        activation.release();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!activation.is_active());

        activation.acquire();
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert_eq!(activation.subscribers(), 1);
    }

    #[tokio::test]
    async fn shutdown_stops_and_blocks_restart() {
        let (activation, starts, stops) = counting_activation();

        activation.acquire();
        activation.shutdown();
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        activation.release();
        activation.acquire();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_churn_never_overlaps_start_and_stop() {
        let running = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let monitor = FnMonitor::<Level>::new()
            .on_start({
                let running = Arc::clone(&running);
                let overlaps = Arc::clone(&overlaps);
                move |_| {
                    if running.fetch_add(1, Ordering::SeqCst) != 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
            .on_stop({
                let running = Arc::clone(&running);
                move || {
                    std::thread::yield_now();
                    running.fetch_sub(1, Ordering::SeqCst);
                }
            });

        let (sender, _receiver) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            sender.downgrade(),
            Arc::from("level"),
            tokio::runtime::Handle::current(),
        );
        let activation = Arc::new(Activation::new(
            "level".to_string(),
            Some(Box::new(monitor)),
            dispatcher,
        ));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let activation = Arc::clone(&activation);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        activation.acquire();
                        activation.release();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(running.load(Ordering::SeqCst), 0);
        assert_eq!(activation.subscribers(), 0);
    }
}
