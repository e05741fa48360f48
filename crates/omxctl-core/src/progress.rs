//! Periodic progress reporting
//!
//! A subscription is a tokio task that ticks at a fixed interval, asks a sampler
//! for a [`ProgressSnapshot`] and hands it to the subscriber. The sampler returns
//! `None` while there is nothing to report, and then the subscriber is not called.
//!
//! Callbacks run under a re-entrant gate. [`ProgressHandle::cancel`] takes the
//! same gate, so once it returns no callback is running on another thread and
//! none will start. Cancelling from inside the callback is allowed.

use crate::reply::PlayStatus;
use parking_lot::{Mutex, ReentrantMutex};
use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Playback progress at one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    #[serde(serialize_with = "as_millis")]
    pub position: Duration,
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
    pub status: PlayStatus,
}

impl ProgressSnapshot {
    pub fn position_ms(&self) -> u64 {
        self.position.as_millis() as u64
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

fn as_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

/// Produces a snapshot, or `None` when the tick should stay silent
pub type ProgressSampler = Arc<dyn Fn() -> Option<ProgressSnapshot> + Send + Sync>;

/// Receives snapshots
pub type ProgressCallback = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

struct Subscription {
    cancelled: AtomicBool,
    gate: ReentrantMutex<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running subscription
#[derive(Clone)]
pub struct ProgressHandle {
    subscription: Arc<Subscription>,
}

impl ProgressHandle {
    fn new() -> Self {
        Self {
            subscription: Arc::new(Subscription {
                cancelled: AtomicBool::new(false),
                gate: ReentrantMutex::new(()),
                task: Mutex::new(None),
            }),
        }
    }

    /// Stop the subscription; no callback runs after this returns. Idempotent.
    pub fn cancel(&self) {
        let subscription = &self.subscription;
        if subscription.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        // Waits out a callback in progress on another thread
        let _gate = subscription.gate.lock();
        if let Some(task) = subscription.task.lock().take() {
            task.abort();
        }
        debug!("Progress subscription cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.subscription.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs progress subscriptions over a sampler
#[derive(Clone)]
pub struct ProgressReporter {
    sampler: ProgressSampler,
}

impl ProgressReporter {
    pub fn new<S>(sampler: S) -> Self
    where
        S: Fn() -> Option<ProgressSnapshot> + Send + Sync + 'static,
    {
        Self {
            sampler: Arc::new(sampler),
        }
    }

    /// Start ticking every `interval`; the first tick fires one interval from now
    ///
    /// Outside a tokio runtime the returned handle is already cancelled.
    pub fn subscribe<F>(&self, interval: Duration, callback: F) -> ProgressHandle
    where
        F: Fn(ProgressSnapshot) + Send + Sync + 'static,
    {
        let handle = ProgressHandle::new();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Progress subscription requested outside a runtime; ignoring");
            handle.subscription.cancelled.store(true, Ordering::SeqCst);
            return handle;
        };

        let period = interval.max(Duration::from_millis(1));
        let sampler = self.sampler.clone();
        let callback: ProgressCallback = Arc::new(callback);
        let subscription = handle.subscription.clone();

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let _gate = subscription.gate.lock();
                if subscription.cancelled.load(Ordering::SeqCst) {
                    break;
                }
                if let Some(snapshot) = sampler() {
                    callback(snapshot);
                }
            }
        });

        *handle.subscription.task.lock() = Some(task);
        debug!("Progress subscription started every {:?}", period);
        handle
    }
}
