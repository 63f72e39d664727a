//! Mock platform input emulator for unit testing.
//!
//! # Why a mock emulator?
//!
//! The real emulator calls `SendInput`, which:
//!
//! - Requires an interactive Windows desktop.
//! - Actually moves the cursor or presses keys on the test machine.
//! - Cannot be observed directly from Rust test code.
//!
//! The `MockInputEmulator` replaces every OS call with in-memory recording.
//! Each emitted event is pushed into a `Mutex<Vec<...>>` so that assertions
//! can inspect exactly what was emitted and in what order.
//!
//! # Failure injection
//!
//! Call [`MockInputEmulator::set_should_fail`] to make every method return
//! `EmulationError::Platform`.  The flag is atomic so it can be flipped while
//! the emulator is shared behind an `Arc` with a running session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use mirror_core::MouseButton;

use crate::application::replay_input::{EmulationError, PlatformInputEmulator};

/// A mock emulator that records all calls without performing OS API calls.
#[derive(Default)]
pub struct MockInputEmulator {
    /// `(vk_code, scan_code)` pairs passed to `emit_key_down`.
    pub key_downs: Mutex<Vec<(u32, u32)>>,
    /// `(vk_code, scan_code)` pairs passed to `emit_key_up`.
    pub key_ups: Mutex<Vec<(u32, u32)>>,
    /// Normalized positions passed to `emit_mouse_move`.
    pub mouse_moves: Mutex<Vec<(i32, i32)>>,
    /// `(button, pressed)` pairs from `emit_mouse_button`.
    pub mouse_buttons: Mutex<Vec<(MouseButton, bool)>>,
    /// Deltas from `emit_mouse_wheel`.
    pub wheels: Mutex<Vec<i32>>,
    should_fail: AtomicBool,
}

impl MockInputEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Total number of recorded calls of any kind.
    pub fn total_emitted(&self) -> usize {
        self.key_downs.lock().unwrap().len()
            + self.key_ups.lock().unwrap().len()
            + self.mouse_moves.lock().unwrap().len()
            + self.mouse_buttons.lock().unwrap().len()
            + self.wheels.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), EmulationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        Ok(())
    }
}

impl PlatformInputEmulator for MockInputEmulator {
    fn emit_key_down(&self, vk_code: u32, scan_code: u32) -> Result<(), EmulationError> {
        self.check()?;
        self.key_downs.lock().unwrap().push((vk_code, scan_code));
        Ok(())
    }

    fn emit_key_up(&self, vk_code: u32, scan_code: u32) -> Result<(), EmulationError> {
        self.check()?;
        self.key_ups.lock().unwrap().push((vk_code, scan_code));
        Ok(())
    }

    fn emit_mouse_move(&self, nx: i32, ny: i32) -> Result<(), EmulationError> {
        self.check()?;
        self.mouse_moves.lock().unwrap().push((nx, ny));
        Ok(())
    }

    fn emit_mouse_button(&self, button: MouseButton, pressed: bool) -> Result<(), EmulationError> {
        self.check()?;
        self.mouse_buttons.lock().unwrap().push((button, pressed));
        Ok(())
    }

    fn emit_mouse_wheel(&self, delta: i32) -> Result<(), EmulationError> {
        self.check()?;
        self.wheels.lock().unwrap().push(delta);
        Ok(())
    }
}
