//! InputReplayer: turns received input events into OS input.
//!
//! This use case sits at the application layer and delegates to a
//! [`PlatformInputEmulator`] trait object for OS-level event injection.
//! The platform-specific implementations are in the infrastructure layer.
//!
//! Only mouse moves are transformed on the way through: the sender's screen
//! coordinates are mapped onto the receiver's virtual desktop with
//! [`mirror_core::normalize`].  Buttons and wheel deltas pass through as-is.

use std::sync::Arc;

use mirror_core::{normalize, InputEvent, InputEventKind, MouseButton, ScreenGeometry, SessionError};
use thiserror::Error;

/// Error type for OS input injection.
#[derive(Debug, Error)]
pub enum EmulationError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Error type for replaying one event.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Emulation(#[from] EmulationError),
    #[error("unsupported mouse button id {0}")]
    UnsupportedButton(u8),
}

impl From<ReplayError> for SessionError {
    fn from(e: ReplayError) -> Self {
        SessionError::ReplayFailure(e.to_string())
    }
}

/// Platform-agnostic input emulation trait.
///
/// Each supported OS provides an implementation in the infrastructure layer.
pub trait PlatformInputEmulator: Send + Sync {
    /// Presses a key identified by its virtual-key and hardware scan code.
    fn emit_key_down(&self, vk_code: u32, scan_code: u32) -> Result<(), EmulationError>;

    /// Releases a key.
    fn emit_key_up(&self, vk_code: u32, scan_code: u32) -> Result<(), EmulationError>;

    /// Moves the cursor to an absolute position in normalized
    /// (`0..=65536`) virtual-desktop coordinates.
    fn emit_mouse_move(&self, nx: i32, ny: i32) -> Result<(), EmulationError>;

    /// Presses or releases a mouse button at the current cursor position.
    fn emit_mouse_button(&self, button: MouseButton, pressed: bool) -> Result<(), EmulationError>;

    /// Scrolls the vertical wheel by `delta` (multiples of 120 per notch).
    fn emit_mouse_wheel(&self, delta: i32) -> Result<(), EmulationError>;
}

/// Anything that can replay a decoded event.
///
/// The receiver session only depends on this trait; failures are counted,
/// never fatal.
pub trait ReplaySink: Send + Sync {
    fn replay(&self, event: &InputEvent) -> Result<(), ReplayError>;
}

/// The replay use case: dispatches each event kind to the emulator.
pub struct InputReplayer {
    emulator: Arc<dyn PlatformInputEmulator>,
    geometry: ScreenGeometry,
}

impl InputReplayer {
    /// Creates a replayer targeting the virtual desktop `geometry`.
    ///
    /// The geometry is captured once; a zero-sized desktop is replaced by the
    /// nominal 1920×1080 fallback at normalization time.
    pub fn new(emulator: Arc<dyn PlatformInputEmulator>, geometry: ScreenGeometry) -> Self {
        Self { emulator, geometry }
    }

    pub fn geometry(&self) -> ScreenGeometry {
        self.geometry
    }
}

impl ReplaySink for InputReplayer {
    fn replay(&self, event: &InputEvent) -> Result<(), ReplayError> {
        match event.kind {
            InputEventKind::KeyDown => self.emulator.emit_key_down(event.vk_code, event.scan_code)?,
            InputEventKind::KeyUp => self.emulator.emit_key_up(event.vk_code, event.scan_code)?,
            InputEventKind::MouseMove => {
                let (nx, ny) = normalize(event.x, event.y, self.geometry);
                self.emulator.emit_mouse_move(nx, ny)?;
            }
            InputEventKind::MouseButtonDown | InputEventKind::MouseButtonUp => {
                let button = MouseButton::try_from(event.button)
                    .map_err(|_| ReplayError::UnsupportedButton(event.button))?;
                let pressed = event.kind == InputEventKind::MouseButtonDown;
                self.emulator.emit_mouse_button(button, pressed)?;
            }
            InputEventKind::MouseWheel => self.emulator.emit_mouse_wheel(event.wheel_delta)?,
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
