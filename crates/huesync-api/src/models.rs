//! Wire models for the bridge's JSON replies, plus the public domain types
//! the rest of the application consumes.
//!
//! The serde structs mirror the bridge's shapes exactly; [`HueClient`]
//! (crate::client::HueClient) converts them into [`EntertainmentArea`] /
//! [`PairedCredentials`] before they leave this crate.

use std::fmt;

use serde::Deserialize;

// ── Public domain types ─────────────────────────────────────────────

/// Keys handed out by a successful pairing.
///
/// `application_key` is the REST bearer identifier (sent as the
/// `hue-application-key` header); `client_key` is the hex-encoded 128-bit
/// pre-shared secret for the streaming channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedCredentials {
    pub application_key: String,
    pub client_key: String,
}

/// An entertainment configuration as reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntertainmentArea {
    /// Resource UUID (36 chars), used for activation and stream framing.
    pub id: String,
    pub name: String,
    /// Configuration type, e.g. `screen` or `3dspace`.
    pub kind: String,
    /// `active` while some client is streaming, otherwise `inactive`.
    pub status: String,
    /// Channel ids in the bridge's order — the framer emits one block per
    /// entry in exactly this order.
    pub channel_ids: Vec<u8>,
    /// Number of light services grouped into this area.
    pub light_count: usize,
}

impl fmt::Display for EntertainmentArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} channels, {} lights)",
            self.name,
            self.channel_ids.len(),
            self.light_count
        )
    }
}

// ── Pair reply ──────────────────────────────────────────────────────
//
// POST /api replies with an array of objects, each carrying either a
// `success` or an `error` member.

#[derive(Debug, Deserialize)]
pub(crate) struct PairReply {
    pub success: Option<PairSuccess>,
    pub error: Option<PairError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PairSuccess {
    pub username: String,
    pub clientkey: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PairError {
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub description: String,
}

// ── Entertainment configuration envelope ────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct EntertainmentEnvelope {
    #[serde(default)]
    pub data: Vec<EntertainmentData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntertainmentData {
    pub id: String,
    #[serde(default)]
    pub metadata: EntertainmentMeta,
    #[serde(default)]
    pub configuration_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub channels: Vec<ChannelData>,
    #[serde(default)]
    pub light_services: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EntertainmentMeta {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelData {
    pub channel_id: u8,
}

impl From<EntertainmentData> for EntertainmentArea {
    fn from(d: EntertainmentData) -> Self {
        Self {
            id: d.id,
            name: d.metadata.name,
            kind: d.configuration_type,
            status: d.status,
            channel_ids: d.channels.into_iter().map(|c| c.channel_id).collect(),
            light_count: d.light_services.len(),
        }
    }
}
