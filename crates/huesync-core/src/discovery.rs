//! mDNS discovery of Hue bridges on the local link.
//!
//! Bridges announce themselves as `_hue._tcp.local.` with TXT records
//! carrying `bridgeid` and `modelid`. Discovery runs as a background task
//! that forwards each unique bridge over a channel until a caller-supplied
//! deadline elapses; construction failures arrive on a separate one-shot
//! error channel, after which no bridges are emitted.

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::CoreError;

const SERVICE_TYPE: &str = "_hue._tcp.local.";

/// A Hue bridge discovered on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    /// Stable bridge id from the `bridgeid` TXT record (may be empty for
    /// non-conforming responders).
    pub id: String,
    /// Hardware model from the `modelid` TXT record.
    pub model: String,
    /// mDNS instance name.
    pub name: String,
    pub ip: IpAddr,
    pub port: u16,
    pub hostname: String,
}

impl fmt::Display for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}:{}", self.name, self.id, self.ip, self.port)
    }
}

/// Browse for Hue bridges until `timeout` elapses.
///
/// Returns the bridge channel and a terminal-error channel. Bridges are
/// deduplicated by `bridgeid`; entries without one pass through as-is.
/// The bridge channel closes when the deadline is reached, the browse
/// terminates, or an error was reported.
pub fn discover_bridges(
    timeout: Duration,
) -> (mpsc::Receiver<Bridge>, oneshot::Receiver<CoreError>) {
    let (bridge_tx, bridge_rx) = mpsc::channel(16);
    let (err_tx, err_rx) = oneshot::channel();

    tokio::spawn(async move {
        let daemon = match ServiceDaemon::new() {
            Ok(d) => d,
            Err(e) => {
                let _ = err_tx.send(CoreError::Discovery(format!("creating mDNS daemon: {e}")));
                return;
            }
        };

        let events = match daemon.browse(SERVICE_TYPE) {
            Ok(rx) => rx,
            Err(e) => {
                let _ = err_tx.send(CoreError::Discovery(format!("browsing for bridges: {e}")));
                let _ = daemon.shutdown();
                return;
            }
        };

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut seen = Dedup::new();

        loop {
            tokio::select! {
                () = &mut deadline => break,
                event = events.recv_async() => match event {
                    Ok(ServiceEvent::ServiceResolved(info)) => {
                        let Some(bridge) = parse_bridge(&info) else {
                            debug!(fullname = info.get_fullname(), "resolved service without address");
                            continue;
                        };
                        if !seen.admit(&bridge) {
                            continue;
                        }
                        debug!(%bridge, "discovered bridge");
                        if bridge_tx.send(bridge).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "mDNS event channel closed");
                        break;
                    }
                },
            }
        }

        if let Err(e) = daemon.shutdown() {
            debug!(error = %e, "mDNS daemon shutdown");
        }
    });

    (bridge_rx, err_rx)
}

/// Tracks bridge ids already emitted this browse. mDNS resolvers answer
/// the same service from several interfaces, so duplicates are the norm;
/// entries without a `bridgeid` cannot be correlated and pass through.
struct Dedup(HashSet<String>);

impl Dedup {
    fn new() -> Self {
        Self(HashSet::new())
    }

    /// `true` when this bridge has not been emitted before.
    fn admit(&mut self, bridge: &Bridge) -> bool {
        bridge.id.is_empty() || self.0.insert(bridge.id.clone())
    }
}

/// Extract a [`Bridge`] from a resolved service entry.
///
/// Prefers the first IPv4 address, falling back to IPv6; entries with no
/// address at all are dropped.
fn parse_bridge(info: &ServiceInfo) -> Option<Bridge> {
    let addresses = info.get_addresses();
    let ip = addresses
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addresses.iter().next())
        .copied()?;

    let name = info
        .get_fullname()
        .strip_suffix(&format!(".{SERVICE_TYPE}"))
        .unwrap_or(info.get_fullname())
        .to_string();

    Some(Bridge {
        id: info
            .get_property_val_str("bridgeid")
            .unwrap_or_default()
            .to_string(),
        model: info
            .get_property_val_str("modelid")
            .unwrap_or_default()
            .to_string(),
        name,
        ip,
        port: info.get_port(),
        hostname: info.get_hostname().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_info(
        instance: &str,
        host: &str,
        ips: &[IpAddr],
        props: &[(&str, &str)],
    ) -> ServiceInfo {
        let ip_list = ips
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let properties: std::collections::HashMap<String, String> = props
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceInfo::new(SERVICE_TYPE, instance, host, ip_list.as_str(), 443, properties).unwrap()
    }

    #[test]
    fn parse_bridge_extracts_txt_records() {
        let info = service_info(
            "Philips Hue - ABC123",
            "abc123.local.",
            &["192.168.1.50".parse().unwrap()],
            &[("bridgeid", "001788fffe4d2e90"), ("modelid", "BSB002")],
        );

        let bridge = parse_bridge(&info).unwrap();
        assert_eq!(bridge.id, "001788fffe4d2e90");
        assert_eq!(bridge.model, "BSB002");
        assert_eq!(bridge.name, "Philips Hue - ABC123");
        assert_eq!(bridge.ip, "192.168.1.50".parse::<IpAddr>().unwrap());
        assert_eq!(bridge.port, 443);
    }

    #[test]
    fn parse_bridge_prefers_ipv4() {
        let v6: IpAddr = "fe80::1".parse().unwrap();
        let v4: IpAddr = "10.0.0.2".parse().unwrap();
        let info = service_info("Bridge", "b.local.", &[v6, v4], &[]);

        let bridge = parse_bridge(&info).unwrap();
        assert_eq!(bridge.ip, v4);
    }

    #[test]
    fn parse_bridge_falls_back_to_ipv6() {
        let v6: IpAddr = "fe80::1".parse().unwrap();
        let info = service_info("Bridge", "b.local.", &[v6], &[]);

        let bridge = parse_bridge(&info).unwrap();
        assert_eq!(bridge.ip, v6);
    }

    #[test]
    fn parse_bridge_without_txt_records() {
        let info = service_info("Bare", "bare.local.", &["10.0.0.3".parse().unwrap()], &[]);

        let bridge = parse_bridge(&info).unwrap();
        assert!(bridge.id.is_empty());
        assert!(bridge.model.is_empty());
    }

    fn bridge(id: &str) -> Bridge {
        Bridge {
            id: id.into(),
            model: String::new(),
            name: "Bridge".into(),
            ip: "10.0.0.1".parse().unwrap(),
            port: 443,
            hostname: "b.local.".into(),
        }
    }

    #[test]
    fn dedup_emits_each_bridge_id_at_most_once() {
        let mut seen = Dedup::new();
        assert!(seen.admit(&bridge("001788fffe4d2e90")));
        assert!(!seen.admit(&bridge("001788fffe4d2e90")));
        assert!(seen.admit(&bridge("001788fffe000000")));
    }

    #[test]
    fn dedup_always_admits_idless_entries() {
        let mut seen = Dedup::new();
        assert!(seen.admit(&bridge("")));
        assert!(seen.admit(&bridge("")));
    }

    #[tokio::test]
    async fn discover_closes_channel_at_deadline() {
        // No bridges on a CI network; the channel must still close promptly.
        let (mut bridges, _errs) = discover_bridges(Duration::from_millis(100));
        let got = tokio::time::timeout(Duration::from_secs(5), bridges.recv())
            .await
            .expect("channel should close at the deadline");
        assert!(got.is_none());
    }
}
