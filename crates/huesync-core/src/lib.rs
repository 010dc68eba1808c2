//! Domain core for huesync.
//!
//! Everything between the bridge REST API and the terminal UI lives here:
//!
//! - [`color`] — the 8-bit RGB primitive and the frame averagers that
//!   reduce a captured frame to a single color.
//! - [`credentials`] — the persistent per-bridge credential store under
//!   `~/.huesync/credentials.json`.
//! - [`discovery`] — mDNS browse for Hue bridges on the local link.
//! - [`stream`] — the HueStream v2 framer and the PSK-DTLS streamer that
//!   pushes color frames to the bridge on UDP/2100.
//! - [`capture`] — three interchangeable screen-capture backends behind a
//!   single selector.
//!
//! The orchestrator (the `huesync-tui` binary) drives these pieces from a
//! single-threaded action loop; every type here that crosses into a worker
//! task is `Send + Sync` and owns its resources exclusively.

pub mod capture;
pub mod color;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod stream;

pub use capture::{new_capturer, Capturer, CAPTURE_HEIGHT, CAPTURE_WIDTH, FRAME_SIZE};
pub use color::{average_rgb, average_rgba, Rgb};
pub use credentials::{BridgeCredentials, CredentialStore};
pub use discovery::{discover_bridges, Bridge};
pub use error::CoreError;
pub use stream::{build_message, Streamer};
