//! Lock-free lifecycle primitives shared between capture threads, transport
//! tasks and the session core.
//!
//! # Why atomics? (for beginners)
//!
//! The OS delivers captured input on its own thread, the WebSocket reader runs
//! on a tokio worker and the user presses "pause" on yet another thread.  All
//! of them need to read "are we paused?" on every event.  An atomic operation
//! is a CPU instruction that reads or writes a value as a single indivisible
//! step, so these checks never block and never observe a torn value.
//!
//! `Ordering::SeqCst` is used for the flags because they gate behaviour across
//! threads.  The counters are statistics only and use `Ordering::Relaxed`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::protocol::event::{InputEvent, InputEventKind};

/// Default minimum spacing between forwarded mouse moves (~60 Hz).
pub const DEFAULT_MOUSE_THROTTLE: Duration = Duration::from_millis(16);

// ── Flags ─────────────────────────────────────────────────────────────────────

/// Shared boolean state of one session.
#[derive(Debug, Default)]
pub struct SessionFlags {
    connected: AtomicBool,
    paused: AtomicBool,
    running: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self, value: bool) {
        self.connected.store(value, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Sets the pause flag and returns the previous value.
    pub fn set_paused(&self, value: bool) -> bool {
        self.paused.swap(value, Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::SeqCst);
    }

    /// Returns `true` when input events may flow: connected and not paused.
    pub fn is_forwarding(&self) -> bool {
        self.is_connected() && !self.is_paused()
    }
}

// ── Counters ──────────────────────────────────────────────────────────────────

/// Point-in-time copy of an [`EventCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventCounts {
    pub sent: u64,
    pub received: u64,
    pub dropped: u64,
    pub replay_failures: u64,
}

/// Monotonic per-session event statistics.
///
/// Each counter wraps at `u64::MAX` without panicking.
#[derive(Debug, Default)]
pub struct EventCounter {
    sent: AtomicU64,
    received: AtomicU64,
    dropped: AtomicU64,
    replay_failures: AtomicU64,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An event was encrypted and handed to the transport.
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// An event was decrypted, decoded and passed to the replay sink.
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// An event was discarded (pause, throttle, undecryptable, undecodable).
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// The replay sink reported a failure.
    pub fn record_replay_failure(&self) {
        self.replay_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Zeroes every counter, for the start of a new peer session.
    pub fn reset(&self) {
        self.sent.store(0, Ordering::Relaxed);
        self.received.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.replay_failures.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EventCounts {
        EventCounts {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            replay_failures: self.replay_failures.load(Ordering::Relaxed),
        }
    }
}

// ── Throttle ──────────────────────────────────────────────────────────────────

const NEVER: u64 = u64::MAX;

/// Source-side rate limiter for `MouseMove` events.
///
/// At most one move is admitted per `interval`; faster moves are dropped, not
/// queued, so the receiver always sees the freshest position.  Keyboard,
/// button and wheel events are always admitted.
#[derive(Debug)]
pub struct MouseMoveThrottle {
    interval_us: u64,
    epoch: Instant,
    last_us: AtomicU64,
}

impl MouseMoveThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_us: u64::try_from(interval.as_micros()).unwrap_or(u64::MAX),
            epoch: Instant::now(),
            last_us: AtomicU64::new(NEVER),
        }
    }

    /// Decides whether `event` may be forwarded now.
    pub fn admit(&self, event: &InputEvent) -> bool {
        self.admit_at(event, Instant::now())
    }

    /// Decides whether `event` may be forwarded at time `now`.
    pub fn admit_at(&self, event: &InputEvent, now: Instant) -> bool {
        if event.kind != InputEventKind::MouseMove {
            return true;
        }

        let now_us =
            u64::try_from(now.saturating_duration_since(self.epoch).as_micros()).unwrap_or(NEVER - 1);

        let mut last = self.last_us.load(Ordering::Relaxed);
        loop {
            if last != NEVER && now_us.saturating_sub(last) < self.interval_us {
                return false;
            }
            match self
                .last_us
                .compare_exchange_weak(last, now_us, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(actual) => last = actual,
            }
        }
    }

    /// Forgets the last admitted move so the next one passes immediately.
    pub fn reset(&self) {
        self.last_us.store(NEVER, Ordering::Relaxed);
    }
}

impl Default for MouseMoveThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MOUSE_THROTTLE)
    }
}
