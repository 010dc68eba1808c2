//! Entertainment streaming to the bridge over PSK DTLS.
//!
//! Once an area is active, the bridge listens on UDP/2100 for a DTLS
//! handshake authenticated by the pairing's client key — the bridge never
//! presents a verifiable certificate on this channel, the pre-shared key
//! *is* the mutual authentication. Each datagram is one HueStream v2
//! message (see [`message`]); the bridge drops datagrams whose sequence
//! number runs backwards, so sends are strictly ordered.

mod message;

pub use message::build_message;

use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::debug;
use webrtc_dtls::cipher_suite::CipherSuiteId;
use webrtc_dtls::config::Config;
use webrtc_dtls::conn::DTLSConn;
use webrtc_util::Conn;

use crate::color::Rgb;
use crate::error::CoreError;

/// UDP port of the bridge's entertainment listener.
const STREAM_PORT: u16 = 2100;

/// Deadline for the DTLS handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// An open streaming session to one entertainment area.
///
/// Owns the DTLS connection exclusively; [`close`](Self::close) releases
/// the socket. Safe to share behind an `Arc` — the sequence counter is
/// atomic and the connection handles its own synchronization.
pub struct Streamer {
    conn: Arc<DTLSConn>,
    area_id: String,
    channel_ids: Vec<u8>,
    seq: AtomicU8,
}

impl Streamer {
    /// Open a DTLS session to the bridge at `ip` for `area_id`.
    ///
    /// `client_key_hex` is the hex-encoded PSK from pairing; the
    /// application key doubles as the PSK identity hint. The handshake is
    /// bounded by a 5-second deadline.
    pub async fn connect(
        ip: IpAddr,
        application_key: &str,
        client_key_hex: &str,
        area_id: String,
        channel_ids: Vec<u8>,
    ) -> Result<Self, CoreError> {
        let psk = hex::decode(client_key_hex)?;

        let bind_addr = if ip.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect((ip, STREAM_PORT)).await?;

        let config = Config {
            psk: Some(Arc::new(move |_hint: &[u8]| Ok(psk.clone()))),
            psk_identity_hint: Some(application_key.as_bytes().to_vec()),
            cipher_suites: vec![CipherSuiteId::Tls_Psk_With_Aes_128_Gcm_Sha256],
            insecure_skip_verify: true,
            ..Default::default()
        };

        let conn = tokio::time::timeout(
            HANDSHAKE_TIMEOUT,
            DTLSConn::new(Arc::new(socket), config, true, None),
        )
        .await
        .map_err(|_| CoreError::Timeout(HANDSHAKE_TIMEOUT))?
        .map_err(|e| CoreError::Dtls(format!("handshake: {e}")))?;

        debug!(%ip, port = STREAM_PORT, %area_id, "DTLS session established");

        Ok(Self {
            conn: Arc::new(conn),
            area_id,
            channel_ids,
            seq: AtomicU8::new(0),
        })
    }

    /// Send `color` to every channel of the area as one datagram.
    ///
    /// The sequence byte increments after each send and wraps from 255 to
    /// 0. Failures are returned to the caller; the session is never
    /// reconnected implicitly.
    pub async fn send(&self, color: Rgb) -> Result<(), CoreError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let msg = build_message(&self.area_id, &self.channel_ids, color, seq);
        self.conn
            .send(&msg)
            .await
            .map_err(|e| CoreError::Dtls(format!("sending frame: {e}")))?;
        Ok(())
    }

    /// Close the DTLS session and release the socket.
    pub async fn close(&self) -> Result<(), CoreError> {
        self.conn
            .close()
            .await
            .map_err(|e| CoreError::Dtls(format!("closing session: {e}")))
    }

    /// The entertainment area this session streams to.
    pub fn area_id(&self) -> &str {
        &self.area_id
    }
}

impl fmt::Debug for Streamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streamer")
            .field("area_id", &self.area_id)
            .field("channel_ids", &self.channel_ids)
            .field("seq", &self.seq.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_counter_wraps_at_256() {
        let seq = AtomicU8::new(0);
        for _ in 0..256 {
            seq.fetch_add(1, Ordering::SeqCst);
        }
        // 256 sends later the next datagram carries sequence 0 again.
        assert_eq!(seq.load(Ordering::SeqCst), 0);

        seq.store(255, Ordering::SeqCst);
        assert_eq!(seq.fetch_add(1, Ordering::SeqCst), 255);
        assert_eq!(seq.load(Ordering::SeqCst), 0);
    }
}
