//! Platform-specific input emulation implementations.
//!
//! The correct implementation is selected at compile time via `#[cfg(target_os = ...)]`.

use std::sync::Arc;

use crate::application::replay_input::{EmulationError, PlatformInputEmulator};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Returns the platform's input emulator.
///
/// # Errors
///
/// Returns [`EmulationError::UnsupportedPlatform`] where no emulator exists.
pub fn platform_emulator() -> Result<Arc<dyn PlatformInputEmulator>, EmulationError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::WindowsInputEmulator::new()))
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(EmulationError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}
