//! Windows virtual desktop query via `GetSystemMetrics`.

use mirror_core::ScreenGeometry;
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXSCREEN, SM_CXVIRTUALSCREEN, SM_CYSCREEN, SM_CYVIRTUALSCREEN,
    SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN,
};

/// Returns the bounding rectangle of all monitors.
///
/// Falls back to the primary monitor's size when the virtual screen metrics
/// report zero (e.g. inside some remote sessions).
pub fn virtual_screen() -> ScreenGeometry {
    // SAFETY: GetSystemMetrics has no preconditions and only reads system state.
    let (left, top, mut width, mut height) = unsafe {
        (
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN),
            GetSystemMetrics(SM_CYVIRTUALSCREEN),
        )
    };

    if width == 0 {
        // SAFETY: as above.
        width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
    }
    if height == 0 {
        // SAFETY: as above.
        height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
    }

    ScreenGeometry::new(left, top, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smoke test: any machine running the test suite has a desktop.
    #[test]
    fn test_virtual_screen_has_positive_size() {
        let geometry = virtual_screen();
        assert!(geometry.width > 0, "width must be positive: {geometry:?}");
        assert!(geometry.height > 0, "height must be positive: {geometry:?}");
    }
}
