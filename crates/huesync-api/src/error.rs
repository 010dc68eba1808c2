use thiserror::Error;

/// Top-level error type for the `huesync-api` crate.
///
/// Recoverable conditions the orchestrator reacts to
/// ([`LinkButtonNotPressed`](Error::LinkButtonNotPressed),
/// [`Unauthorized`](Error::Unauthorized)) are structural variants so callers
/// match on them instead of comparing strings.
#[derive(Debug, Error)]
pub enum Error {
    // ── Pairing ─────────────────────────────────────────────────────
    /// The bridge refused to pair because the physical link button has not
    /// been pressed (bridge error type 101).
    #[error("link button not pressed")]
    LinkButtonNotPressed,

    /// The bridge returned a structured error other than 101.
    #[error("bridge error {kind}: {description}")]
    Bridge { kind: i64, description: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The bridge rejected the stored application key (HTTP 403).
    #[error("unauthorized")]
    Unauthorized,

    // ── Responses ───────────────────────────────────────────────────
    /// The bridge reply did not match the documented shape.
    #[error("malformed bridge response: {0}")]
    MalformedResponse(String),

    /// A non-2xx status on an endpoint that returns no useful body.
    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, TLS, ...).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL construction failed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
