//! Paint-frame scheduling for pointer-driven frame updates.
//!
//! In a browser this is `requestAnimationFrame`/`cancelAnimationFrame`. The
//! controller keeps at most one request outstanding per session and cancels
//! it whenever a newer pointer position arrives.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

pub type FrameCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

pub trait FrameScheduler: Send + Sync {
    /// Run `callback` before the next paint. Must not run it synchronously.
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    /// Drop a pending callback. Unknown or already-run handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Fixed-interval stand-in for the display refresh, driven by tokio.
pub struct IntervalScheduler {
    runtime: Handle,
    interval: Duration,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
}

impl IntervalScheduler {
    /// Binds to the current tokio runtime; call from within it.
    pub fn new(interval: Duration) -> Self {
        Self {
            runtime: Handle::current(),
            interval,
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl FrameScheduler for IntervalScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let interval = self.interval;
        let pending = Arc::clone(&self.pending);
        // Hold the lock across spawn so the task cannot deregister before it is registered.
        let mut guard = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            let still_pending = match pending.lock() {
                Ok(mut map) => map.remove(&id).is_some(),
                Err(poisoned) => poisoned.into_inner().remove(&id).is_some(),
            };
            if still_pending {
                trace!(frame = id, "Running frame callback");
                callback();
            }
        });
        guard.insert(id, task);
        FrameHandle(id)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let task = match self.pending.lock() {
            Ok(mut map) => map.remove(&handle.0),
            Err(poisoned) => poisoned.into_inner().remove(&handle.0),
        };
        if let Some(task) = task {
            task.abort();
        }
    }
}
