//! Completion messages posted back to the app loop by worker tasks.
//!
//! Every long-running operation (scan, pair, fetch, activate, connect,
//! per-frame capture+send, stop) runs in a spawned task and reports its
//! outcome as exactly one `Action`. The state machine owns all mutable
//! state; workers only ever hand results across this channel.

use std::fmt;
use std::sync::Arc;

use huesync_api::{EntertainmentArea, PairedCredentials};
use huesync_core::{Bridge, Capturer, Rgb, Streamer};

/// Everything a live streaming session needs, assembled off-thread.
pub struct SessionParts {
    pub streamer: Arc<Streamer>,
    pub capturer: Arc<Capturer>,
    /// Human-readable capture method label ("PipeWire", "FFmpeg", "X11").
    pub method: &'static str,
}

impl fmt::Debug for SessionParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParts")
            .field("area_id", &self.streamer.area_id())
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Worker-task completions driving the state machine.
#[derive(Debug)]
pub enum Action {
    /// Discovery finished: every bridge found within the deadline, or the
    /// terminal discovery error.
    ScanFinished(Result<Vec<Bridge>, String>),

    /// Pairing attempt finished. The error stays structural so the state
    /// machine can distinguish "link button not pressed" from fatal
    /// failures.
    PairFinished(Result<PairedCredentials, huesync_api::Error>),

    /// Entertainment-area fetch finished. `Unauthorized` triggers the
    /// credential-rejection re-pair path.
    AreasFetched(Result<Vec<EntertainmentArea>, huesync_api::Error>),

    /// Area activation finished.
    AreaActivated(Result<(), String>),

    /// Capturer selection + DTLS handshake finished.
    SessionConnected(Result<SessionParts, String>),

    /// One capture→average→send cycle finished.
    FrameSent(Result<Rgb, String>),

    /// The inter-frame delay elapsed; time for the next frame.
    StreamTick,

    /// Transport closed and deactivate attempted; any error to surface.
    StopFinished(Option<String>),
}
