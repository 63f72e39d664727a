//! Mock capture source for unit testing.
//!
//! Allows tests to inject synthetic [`InputEvent`]s without requiring a
//! running Windows message loop or OS hooks.  The mock honours the same
//! running/paused gating as the real hook callbacks.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use mirror_core::InputEvent;

use super::{CaptureCallback, CaptureError, CaptureSource};

/// A mock implementation of [`CaptureSource`] that allows tests to inject events.
#[derive(Default)]
pub struct MockCaptureSource {
    callback: Mutex<Option<Arc<CaptureCallback>>>,
    running: AtomicBool,
    paused: AtomicBool,
    start_count: AtomicU32,
    stop_count: AtomicU32,
}

impl MockCaptureSource {
    /// Creates a new, stopped mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a synthetic event, as if captured from hardware.
    ///
    /// Returns `true` if the callback was invoked, `false` if the source is
    /// stopped or paused.
    pub fn inject(&self, event: InputEvent) -> bool {
        if !self.is_running() || self.is_paused() {
            return false;
        }
        let callback = self.callback.lock().ok().and_then(|guard| guard.clone());
        match callback {
            Some(cb) => {
                cb(event);
                true
            }
            None => false,
        }
    }

    /// Number of successful `start()` calls.
    pub fn start_count(&self) -> u32 {
        self.start_count.load(Ordering::SeqCst)
    }

    /// Number of `stop()` calls that actually stopped a running source.
    pub fn stop_count(&self) -> u32 {
        self.stop_count.load(Ordering::SeqCst)
    }
}

impl CaptureSource for MockCaptureSource {
    fn start(&self, callback: CaptureCallback) -> Result<(), CaptureError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::AlreadyRunning);
        }
        if let Ok(mut guard) = self.callback.lock() {
            *guard = Some(Arc::new(callback));
        }
        self.paused.store(false, Ordering::SeqCst);
        self.start_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            if let Ok(mut guard) = self.callback.lock() {
                *guard = None;
            }
            self.stop_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
