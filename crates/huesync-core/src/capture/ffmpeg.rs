//! Screen capture via an `ffmpeg` child process grabbing the X display.
//!
//! ffmpeg reads `$DISPLAY` with the `x11grab` input, scales to the fixed
//! capture size, and writes packed RGB24 frames to stdout, which the
//! shared reader drains into the latest-frame slot. Declines to
//! initialize when `DISPLAY` is unset or ffmpeg is missing.

use tokio::process::Command;

use crate::capture::{has_executable, screen, ChildFrames, CAPTURE_HEIGHT, CAPTURE_WIDTH};
use crate::color::Rgb;
use crate::error::CoreError;

pub struct FfmpegCapturer {
    frames: ChildFrames,
}

impl FfmpegCapturer {
    pub async fn new() -> Result<Self, CoreError> {
        if !has_executable("ffmpeg") {
            return Err(CoreError::Capture("ffmpeg not found on PATH".into()));
        }
        let display = std::env::var("DISPLAY")
            .map_err(|_| CoreError::Capture("DISPLAY not set".into()))?;

        let (width, height) = screen::primary_display_size()?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-nostdin",
            "-loglevel",
            "error",
            "-f",
            "x11grab",
            "-framerate",
            "30",
            "-video_size",
            &format!("{width}x{height}"),
            "-i",
            &format!("{display}.0"),
            "-vf",
            &format!("scale={CAPTURE_WIDTH}:{CAPTURE_HEIGHT}"),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "pipe:1",
        ]);

        let frames = ChildFrames::spawn(cmd).await?;
        Ok(Self { frames })
    }

    pub fn capture_color(&self) -> Result<Rgb, CoreError> {
        self.frames.latest_color()
    }

    pub async fn close(&self) {
        self.frames.shutdown().await;
    }
}
