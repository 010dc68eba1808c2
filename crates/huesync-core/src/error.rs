use std::time::Duration;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Discovery ───────────────────────────────────────────────────
    /// The mDNS resolver could not be constructed or the browse failed.
    #[error("bridge discovery failed: {0}")]
    Discovery(String),

    // ── Streaming ───────────────────────────────────────────────────
    /// The stored client key is not valid hex.
    #[error("decoding client key: {0}")]
    ClientKey(#[from] hex::FromHexError),

    /// The PSK DTLS handshake or a datagram write failed.
    #[error("DTLS error: {0}")]
    Dtls(String),

    /// An operation exceeded its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    // ── Capture ─────────────────────────────────────────────────────
    /// Screen-cast negotiation with the desktop portal failed.
    #[error("screen-cast portal: {0}")]
    Portal(String),

    /// A capture backend could not be initialized.
    #[error("capture setup: {0}")]
    Capture(String),

    /// The capturer has not produced its first frame yet.
    #[error("no frame captured yet")]
    NoFrameYet,

    // ── I/O ─────────────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
