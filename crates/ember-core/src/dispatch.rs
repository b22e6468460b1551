//! Cross-thread handoff to the main thread.
//!
//! Background work (file watchers, periodic timers) never mutates engine
//! state directly. It queues commands here; the simulation thread drains
//! the queue at the top of each frame. The mutex guards only this handoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

/// A queue of commands produced on any thread and drained on the main thread.
pub struct MainThreadQueue<C> {
    inner: Arc<Mutex<Vec<C>>>,
}

impl<C: Send + 'static> MainThreadQueue<C> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a command from any thread.
    pub fn push(&self, command: C) {
        self.inner.lock().push(command);
    }

    /// Take every pending command, in push order.
    pub fn drain(&self) -> Vec<C> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Number of pending commands.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<C> Clone for MainThreadQueue<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Send + 'static> Default for MainThreadQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A background periodic timer. Every `interval`, it produces a command via
/// the supplied factory and pushes it onto a [`MainThreadQueue`].
///
/// The timer thread stops on `stop()` or when the `Timer` is dropped.
pub struct Timer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    /// Spawn a periodic timer feeding `queue`.
    pub fn spawn<C, F>(interval: Duration, queue: MainThreadQueue<C>, make: F) -> Self
    where
        C: Send + 'static,
        F: Fn() -> C + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            debug!(?interval, "timer thread started");
            while !thread_stop.load(Ordering::Relaxed) {
                std::thread::sleep(interval);
                if thread_stop.load(Ordering::Relaxed) {
                    break;
                }
                queue.push(make());
            }
            debug!("timer thread stopped");
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the timer thread to stop and wait for it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // The thread exits after at most one interval; detach rather than
        // block an arbitrary caller on join.
        self.handle.take();
    }
}
