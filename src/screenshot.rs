//! Full-screen capture using the `xcap` crate.
//!
//! This is the only place that talks to the OS for pixels. The image it
//! returns is the frozen backdrop for one capture session.

use image::RgbaImage;
use xcap::Monitor;

/// Captures the primary monitor, falling back to the first one listed.
pub fn capture_primary_monitor() -> Result<RgbaImage, ScreenshotError> {
    let monitors = Monitor::all().map_err(|e| ScreenshotError::MonitorEnumeration(e.to_string()))?;

    let primary = monitors
        .iter()
        .position(|m| m.is_primary().unwrap_or(false))
        .or_else(|| (!monitors.is_empty()).then_some(0))
        .ok_or(ScreenshotError::NoMonitor)?;

    let image = monitors[primary]
        .capture_image()
        .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(ScreenshotError::CaptureFailed("empty image".into()));
    }
    Ok(image)
}

#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("No monitor found")]
    NoMonitor,

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),
}
