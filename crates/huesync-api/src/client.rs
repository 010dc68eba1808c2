// Bridge HTTP client
//
// Wraps `reqwest::Client` with bridge-specific URL construction and reply
// decoding. Every endpoint the streaming session needs lives here: pair,
// list entertainment configurations, activate, deactivate.

use std::net::IpAddr;

use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    EntertainmentArea, EntertainmentEnvelope, PairReply, PairedCredentials,
};
use crate::transport::TransportConfig;

/// Header carrying the application key on authenticated endpoints.
const APPLICATION_KEY_HEADER: &str = "hue-application-key";

/// Identity announced during pairing.
const DEVICE_TYPE: &str = "huesync#device";

/// HTTP client for a single Hue bridge.
pub struct HueClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HueClient {
    /// Create a client against an explicit base URL.
    ///
    /// Used directly by tests; production code goes through
    /// [`for_bridge`](Self::for_bridge).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client for the bridge at `ip`.
    ///
    /// IPv6 literals are bracketed so they survive URL parsing.
    pub fn for_bridge(ip: IpAddr, transport: &TransportConfig) -> Result<Self, Error> {
        let host = match ip {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        };
        let base_url = Url::parse(&format!("https://{host}"))?;
        Self::new(base_url, transport)
    }

    /// The bridge base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url
    }

    fn area_url(&self, area_id: &str) -> Url {
        self.url(&format!(
            "/clip/v2/resource/entertainment_configuration/{area_id}"
        ))
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Register this application with the bridge.
    ///
    /// The user must press the bridge's link button first; until then the
    /// bridge answers with error type 101, surfaced as
    /// [`Error::LinkButtonNotPressed`] so the caller can re-prompt.
    pub async fn pair(&self) -> Result<PairedCredentials, Error> {
        let url = self.url("/api");
        debug!("POST {}", url);

        let body = json!({
            "devicetype": DEVICE_TYPE,
            "generateclientkey": true,
        });

        let replies: Vec<PairReply> = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        // The bridge answers with a single-element array; only the first
        // entry is meaningful.
        let Some(reply) = replies.into_iter().next() else {
            return Err(Error::MalformedResponse("empty pair reply".into()));
        };

        if let Some(err) = reply.error {
            if err.kind == 101 {
                return Err(Error::LinkButtonNotPressed);
            }
            return Err(Error::Bridge {
                kind: err.kind,
                description: err.description,
            });
        }

        match reply.success {
            Some(s) => Ok(PairedCredentials {
                application_key: s.username,
                client_key: s.clientkey,
            }),
            None => Err(Error::MalformedResponse(
                "pair reply carries neither success nor error".into(),
            )),
        }
    }

    /// List the bridge's entertainment configurations.
    ///
    /// HTTP 403 means the application key was revoked or never existed —
    /// the caller should drop its stored credentials and re-pair.
    pub async fn entertainment_areas(
        &self,
        application_key: &str,
    ) -> Result<Vec<EntertainmentArea>, Error> {
        let url = self.url("/clip/v2/resource/entertainment_configuration");
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .header(APPLICATION_KEY_HEADER, application_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Unauthorized);
        }

        let envelope: EntertainmentEnvelope = resp.json().await?;
        Ok(envelope.data.into_iter().map(Into::into).collect())
    }

    /// Start entertainment mode for an area.
    ///
    /// The bridge only accepts the DTLS handshake on UDP/2100 while an
    /// area is active.
    pub async fn activate(&self, application_key: &str, area_id: &str) -> Result<(), Error> {
        self.set_area_action(application_key, area_id, "start").await
    }

    /// Stop entertainment mode for an area.
    pub async fn deactivate(&self, application_key: &str, area_id: &str) -> Result<(), Error> {
        self.set_area_action(application_key, area_id, "stop").await
    }

    async fn set_area_action(
        &self,
        application_key: &str,
        area_id: &str,
        action: &str,
    ) -> Result<(), Error> {
        let url = self.area_url(area_id);
        debug!("PUT {} action={}", url, action);

        let resp = self
            .http
            .put(url)
            .header(APPLICATION_KEY_HEADER, application_key)
            .json(&json!({ "action": action }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_bridge_brackets_ipv6() {
        let transport = TransportConfig::default();

        let v4 = HueClient::for_bridge("192.168.1.50".parse().unwrap(), &transport).unwrap();
        assert_eq!(v4.base_url().as_str(), "https://192.168.1.50/");

        let v6 = HueClient::for_bridge("fe80::1".parse().unwrap(), &transport).unwrap();
        assert_eq!(v6.base_url().host_str(), Some("[fe80::1]"));
    }
}
