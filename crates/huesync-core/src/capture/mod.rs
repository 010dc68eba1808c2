//! Screen capture behind a single interface.
//!
//! Three backends, tried in order of fidelity to the running desktop:
//!
//! 1. [`pipewire`] — compositor screen-cast via the XDG Desktop Portal,
//!    decoded by a spawned `gst-launch-1.0` pipeline. The only backend
//!    that works on Wayland.
//! 2. [`ffmpeg`] — `ffmpeg` child process grabbing the X display.
//! 3. [`screen`] — in-process grab of the primary display. Cannot fail
//!    construction and serves as the guaranteed fallback.
//!
//! The child-process backends expose a usable [`Capturer::capture_color`]
//! from the moment construction returns: a background reader copies each
//! full frame into a shared slot and the factory blocks on the first one
//! (bounded at 5 seconds, after which the child is torn down).

pub mod ffmpeg;
pub mod pipewire;
pub mod screen;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::color::{average_rgb, Rgb};
use crate::error::CoreError;

/// Fixed size child pipelines scale down to before averaging.
pub const CAPTURE_WIDTH: usize = 64;
pub const CAPTURE_HEIGHT: usize = 36;

/// Bytes per scaled RGB24 frame.
pub const FRAME_SIZE: usize = CAPTURE_WIDTH * CAPTURE_HEIGHT * 3;

/// How long the factory waits for a child pipeline's first frame.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// A live capture backend.
///
/// `capture_color` may block briefly (the screen-grab backend reads the
/// framebuffer synchronously) — the orchestrator calls it from a blocking
/// worker. `close` releases the backend's child process, inherited file
/// descriptors, and bus connection in reverse order of acquisition.
pub enum Capturer {
    PipeWire(pipewire::PipeWireCapturer),
    Ffmpeg(ffmpeg::FfmpegCapturer),
    Screen(screen::ScreenCapturer),
}

impl Capturer {
    /// Grab the latest frame and reduce it to its average color.
    pub fn capture_color(&self) -> Result<Rgb, CoreError> {
        match self {
            Self::PipeWire(c) => c.capture_color(),
            Self::Ffmpeg(c) => c.capture_color(),
            Self::Screen(c) => c.capture_color(),
        }
    }

    /// Tear the backend down: stop the reader, kill the child, release
    /// the portal fd and bus connection where present.
    pub async fn close(&self) {
        match self {
            Self::PipeWire(c) => c.close().await,
            Self::Ffmpeg(c) => c.close().await,
            Self::Screen(_) => {}
        }
    }
}

/// Try PipeWire → FFmpeg → screen grab, returning the first backend that
/// initializes along with its human-readable method label.
pub async fn new_capturer() -> (Capturer, &'static str) {
    match pipewire::PipeWireCapturer::new().await {
        Ok(c) => {
            info!("capturing via PipeWire screen-cast");
            return (Capturer::PipeWire(c), "PipeWire");
        }
        Err(e) => debug!(error = %e, "PipeWire capture unavailable"),
    }

    match ffmpeg::FfmpegCapturer::new().await {
        Ok(c) => {
            info!("capturing via ffmpeg x11grab");
            return (Capturer::Ffmpeg(c), "FFmpeg");
        }
        Err(e) => debug!(error = %e, "ffmpeg capture unavailable"),
    }

    info!("capturing via in-process screen grab");
    (Capturer::Screen(screen::ScreenCapturer::new()), "X11")
}

/// Report whether `name` resolves to an executable on `PATH`.
fn has_executable(name: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}

// ── Shared child-process frame reader ────────────────────────────────

/// A child process emitting fixed-size RGB24 frames on stdout, plus the
/// background reader that keeps the latest frame available.
#[derive(Debug)]
pub(crate) struct ChildFrames {
    cancel: CancellationToken,
    reader: Mutex<Option<JoinHandle<()>>>,
    frame: Arc<Mutex<Option<Vec<u8>>>>,
}

impl ChildFrames {
    /// Spawn `cmd` and block until its first full frame has arrived.
    ///
    /// The command must already be configured to write raw frames to
    /// stdout. On timeout the child is killed and an error returned.
    pub(crate) async fn spawn(mut cmd: Command) -> Result<Self, CoreError> {
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| CoreError::Capture(format!("spawning capture pipeline: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .expect("stdout was configured as piped");

        let cancel = CancellationToken::new();
        let frame = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = oneshot::channel();

        let reader = tokio::spawn(read_frames(
            child,
            stdout,
            Arc::clone(&frame),
            ready_tx,
            cancel.clone(),
        ));

        let this = Self {
            cancel,
            reader: Mutex::new(Some(reader)),
            frame,
        };

        // First-frame rendezvous: only hand the capturer out once frames
        // are actually flowing.
        match tokio::time::timeout(FIRST_FRAME_TIMEOUT, ready_rx).await {
            Ok(Ok(())) => Ok(this),
            _ => {
                this.shutdown().await;
                Err(CoreError::Capture(
                    "timed out waiting for first frame".into(),
                ))
            }
        }
    }

    /// Average of the most recent frame.
    pub(crate) fn latest_color(&self) -> Result<Rgb, CoreError> {
        let frame = self.frame.lock().expect("frame slot lock");
        match frame.as_deref() {
            Some(buf) => Ok(average_rgb(buf, CAPTURE_WIDTH * CAPTURE_HEIGHT)),
            None => Err(CoreError::NoFrameYet),
        }
    }

    /// Stop the reader and wait for it to kill and reap the child.
    pub(crate) async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.reader.lock().expect("reader handle lock").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// Reader loop: fill a frame-sized buffer from the pipe, publish it into
/// the shared slot, signal readiness after the first one. Owns the child
/// so teardown and reaping happen in one place.
async fn read_frames(
    mut child: tokio::process::Child,
    mut stdout: tokio::process::ChildStdout,
    slot: Arc<Mutex<Option<Vec<u8>>>>,
    ready: oneshot::Sender<()>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; FRAME_SIZE];
    let mut ready = Some(ready);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            res = stdout.read_exact(&mut buf) => {
                if res.is_err() {
                    break;
                }
                {
                    let mut slot = slot.lock().expect("frame slot lock");
                    match slot.as_mut() {
                        Some(frame) => frame.copy_from_slice(&buf),
                        None => *slot = Some(buf.clone()),
                    }
                }
                if let Some(tx) = ready.take() {
                    let _ = tx.send(());
                }
            }
        }
    }

    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn child_frames_reads_and_averages() {
        // `head` emits exactly one solid-red frame and exits; the reader
        // must publish it and fire the readiness signal.
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(format!(
            "printf '\\377\\000\\000%.0s' $(seq {})",
            CAPTURE_WIDTH * CAPTURE_HEIGHT
        ));

        let frames = ChildFrames::spawn(cmd).await.unwrap();
        assert_eq!(frames.latest_color().unwrap(), Rgb::new(255, 0, 0));
        frames.shutdown().await;
    }

    #[tokio::test]
    async fn child_frames_times_out_without_output() {
        tokio::time::pause();

        let mut cmd = Command::new("sleep");
        cmd.arg("30");

        let spawn = ChildFrames::spawn(cmd);
        tokio::pin!(spawn);

        // Drive past the first-frame deadline.
        let err = spawn.await.unwrap_err();
        assert!(matches!(err, CoreError::Capture(_)));
    }

    #[test]
    fn has_executable_finds_sh() {
        assert!(has_executable("sh"));
        assert!(!has_executable("definitely-not-a-real-binary-9x7"));
    }
}
