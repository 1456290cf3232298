//! Cooperative cancellation for agent runs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared stop flag for one conversation
///
/// The loop polls the flag at iteration boundaries and races the in-flight
/// planning request against [`StopSignal::stopped`].
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    /// Create an unset signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop
    pub fn stop(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether a stop has been requested and not yet consumed
    pub fn is_stopped(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Consume a pending stop request, returning whether there was one
    pub fn take(&self) -> bool {
        self.inner.flag.swap(false, Ordering::SeqCst)
    }

    /// Resolve once a stop is requested
    pub async fn stopped(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}
