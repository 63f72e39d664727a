//! Coordinate normalizer.
//!
//! Absolute pointer injection APIs address the whole virtual desktop with a
//! fixed `0..=65535` grid on each axis, independent of the real resolution or
//! monitor arrangement.  The receiver converts every incoming `MouseMove`
//! position into that grid before replaying it.
//!
//! ```text
//! nx = ((x - left) * 65536) / width  + 1
//! ny = ((y - top)  * 65536) / height + 1
//! ```
//!
//! The arithmetic is done in `i64` so that large virtual desktops (several
//! 4K/8K monitors) cannot overflow the intermediate product.

use serde::{Deserialize, Serialize};

/// Size of the absolute-pointer grid on each axis.
pub const ABSOLUTE_RANGE: i64 = 65_536;

/// Nominal width used when the reported geometry is unusable.
pub const FALLBACK_WIDTH: i32 = 1920;

/// Nominal height used when the reported geometry is unusable.
pub const FALLBACK_HEIGHT: i32 = 1080;

/// Bounding rectangle of the receiver's virtual desktop, in pixels.
///
/// `left`/`top` may be negative when a monitor sits left of or above the
/// primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenGeometry {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Returns this geometry, or a 1920×1080 rectangle at the same origin if
    /// either dimension is zero or negative.
    pub fn or_fallback(self) -> Self {
        if self.width <= 0 || self.height <= 0 {
            Self::new(self.left, self.top, FALLBACK_WIDTH, FALLBACK_HEIGHT)
        } else {
            self
        }
    }
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self::new(0, 0, FALLBACK_WIDTH, FALLBACK_HEIGHT)
    }
}

/// Maps pixel position `(x, y)` onto the absolute-pointer grid of `geometry`.
///
/// Positions outside the rectangle are not clamped; the replay API clamps them
/// to the desktop edge itself.
pub fn normalize(x: i32, y: i32, geometry: ScreenGeometry) -> (i32, i32) {
    let g = geometry.or_fallback();
    (
        scale_axis(x, g.left, g.width),
        scale_axis(y, g.top, g.height),
    )
}

fn scale_axis(value: i32, origin: i32, extent: i32) -> i32 {
    let scaled = (i64::from(value) - i64::from(origin)) * ABSOLUTE_RANGE / i64::from(extent) + 1;
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_of_full_hd_screen() {
        // Arrange
        let geometry = ScreenGeometry::new(0, 0, 1920, 1080);

        // Act
        let result = normalize(960, 540, geometry);

        // Assert
        assert_eq!(result, (32769, 32769));
    }

    #[test]
    fn test_origin_maps_to_one() {
        let geometry = ScreenGeometry::new(0, 0, 1920, 1080);
        assert_eq!(normalize(0, 0, geometry), (1, 1));
    }

    #[test]
    fn test_negative_origin_of_multi_monitor_desktop() {
        // Arrange – a 1920-wide monitor to the left of the primary one
        let geometry = ScreenGeometry::new(-1920, 0, 3840, 1080);

        // Act – the top-left corner of the primary monitor
        let result = normalize(0, 0, geometry);

        // Assert – halfway across the virtual desktop
        assert_eq!(result, (32769, 1));
    }

    #[test]
    fn test_zero_size_falls_back_to_nominal_geometry() {
        let broken = ScreenGeometry::new(0, 0, 0, -5);
        assert_eq!(normalize(960, 540, broken), (32769, 32769));
    }

    #[test]
    fn test_large_desktop_does_not_overflow() {
        // Arrange – 8 side-by-side 8K monitors
        let geometry = ScreenGeometry::new(0, 0, 8 * 7680, 4320);

        // Act
        let (nx, ny) = normalize(8 * 7680 - 1, 4319, geometry);

        // Assert
        assert!(nx > 65_000 && nx <= 65_536);
        assert!(ny > 65_000 && ny <= 65_536);
    }
}
