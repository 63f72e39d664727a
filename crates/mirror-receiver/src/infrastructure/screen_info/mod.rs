//! Virtual desktop geometry of the receiver.
//!
//! # Why does the receiver need screen information?
//!
//! The sender reports mouse positions in its own screen pixels.  Windows'
//! absolute pointer API expects a `0..=65536` grid spanning the *virtual
//! desktop*, which is the bounding rectangle of all monitors and can start at
//! negative coordinates when a monitor sits left of or above the primary one.
//! The replayer needs that rectangle to map one onto the other.
//!
//! | Module    | OS      | API used                                         |
//! |-----------|---------|--------------------------------------------------|
//! | `windows` | Windows | `GetSystemMetrics(SM_[XY]VIRTUALSCREEN, SM_C[XY]VIRTUALSCREEN)` |
//!
//! Other platforms report the nominal 1920×1080 desktop so the crate still
//! builds and tests everywhere.

use mirror_core::ScreenGeometry;
use tracing::warn;

#[cfg(target_os = "windows")]
pub mod windows;

/// Queries the current virtual desktop rectangle.
///
/// Never fails: a platform without a query, or a query that reports an empty
/// desktop, yields the 1920×1080 fallback.
pub fn virtual_screen() -> ScreenGeometry {
    #[cfg(target_os = "windows")]
    let geometry = windows::virtual_screen();

    #[cfg(not(target_os = "windows"))]
    let geometry = ScreenGeometry::default();

    if geometry.width <= 0 || geometry.height <= 0 {
        warn!("Virtual desktop reported as {geometry:?}; using fallback geometry");
    }
    geometry.or_fallback()
}
