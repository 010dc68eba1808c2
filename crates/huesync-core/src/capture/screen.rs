//! In-process screen grab of the primary display.
//!
//! The guaranteed fallback: no child process, no desktop portal, just a
//! synchronous framebuffer grab reduced by the subsampling averager. Each
//! call captures at full resolution, so this backend is the slowest per
//! frame but can never fail to construct.

use xcap::Monitor;

use crate::color::{average_rgba, Rgb};
use crate::error::CoreError;

pub struct ScreenCapturer;

impl ScreenCapturer {
    pub fn new() -> Self {
        Self
    }

    /// Grab the primary display and average it.
    pub fn capture_color(&self) -> Result<Rgb, CoreError> {
        let monitor = primary_monitor()?;
        let image = monitor
            .capture_image()
            .map_err(|e| CoreError::Capture(format!("capturing screen: {e}")))?;

        let width = image.width() as usize;
        let height = image.height() as usize;
        Ok(average_rgba(image.as_raw(), width, height, width * 4))
    }
}

impl Default for ScreenCapturer {
    fn default() -> Self {
        Self::new()
    }
}

/// Dimensions of the primary display, used by the ffmpeg backend to size
/// its grab region.
pub(crate) fn primary_display_size() -> Result<(u32, u32), CoreError> {
    let monitor = primary_monitor()?;
    Ok((monitor.width(), monitor.height()))
}

fn primary_monitor() -> Result<Monitor, CoreError> {
    let mut monitors =
        Monitor::all().map_err(|e| CoreError::Capture(format!("listing displays: {e}")))?;
    if monitors.is_empty() {
        return Err(CoreError::Capture("no active displays found".into()));
    }
    let idx = monitors.iter().position(|m| m.is_primary()).unwrap_or(0);
    Ok(monitors.swap_remove(idx))
}
