//! Input capture infrastructure for the sender application.
//!
//! On Windows, this installs low-level keyboard and mouse hooks (WH_KEYBOARD_LL,
//! WH_MOUSE_LL) on a dedicated Win32 message loop thread and hands every
//! captured event to a callback supplied by the session.
//!
//! # Windows-Specific Implementation
//!
//! The hook callbacks must complete within ~300ms or Windows will remove the
//! hook.  The session callback therefore only throttles the event and posts it
//! onto an unbounded channel; encryption and sending happen elsewhere.
//!
//! # Pause semantics
//!
//! Pausing never uninstalls the hooks.  A paused source keeps receiving OS
//! events and simply stops invoking the callback, so resume is instant.
//!
//! # Testability
//!
//! The [`CaptureSource`] trait allows tests to inject synthetic events through
//! [`mock::MockCaptureSource`] without requiring Windows hooks.

use mirror_core::InputEvent;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Callback invoked for every captured event while the source runs unpaused.
///
/// Called from the capture thread; must return quickly.
pub type CaptureCallback = Box<dyn Fn(InputEvent) + Send + Sync>;

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to install input hooks: {0}")]
    HookInstallFailed(String),
    #[error("capture source is already running")]
    AlreadyRunning,
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Trait abstracting the OS input capture mechanism.
///
/// The production implementation uses Windows hooks; tests use
/// [`mock::MockCaptureSource`].
pub trait CaptureSource: Send + Sync {
    /// Starts capturing and delivers each event to `callback`.
    fn start(&self, callback: CaptureCallback) -> Result<(), CaptureError>;

    /// Stops capturing.  Once this returns the callback is never invoked
    /// again.  Idempotent.
    fn stop(&self);

    /// Suppresses callbacks without releasing OS resources.
    fn pause(&self);

    /// Re-enables callbacks after [`pause`](Self::pause).
    fn resume(&self);

    fn is_running(&self) -> bool;

    fn is_paused(&self) -> bool;
}

/// Returns the platform's default capture source.
///
/// # Errors
///
/// Returns [`CaptureError::UnsupportedPlatform`] on platforms without a
/// capture implementation.
pub fn platform_capture_source() -> Result<std::sync::Arc<dyn CaptureSource>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        Ok(std::sync::Arc::new(windows::WindowsCaptureSource::new()))
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(CaptureError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}
