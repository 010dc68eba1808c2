// Shared transport configuration for building reqwest::Client instances.
//
// Hue bridges terminate TLS with a self-signed certificate whose subject is
// the bridge id, not the IP the client dials, so system-CA verification can
// never succeed against a stock bridge. Verification is therefore disabled
// here; the entertainment channel authenticates the bridge via its
// pre-shared client key instead.

use std::time::Duration;

use crate::error::Error;

/// Transport settings shared by every bridge request.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(Error::Transport)
    }
}
