//! Compositor screen capture via the XDG Desktop Portal.
//!
//! Negotiates a ScreenCast session on the session bus (CreateSession →
//! SelectSources → Start → OpenPipeWireRemote), then spawns a
//! `gst-launch-1.0` pipeline that consumes the portal's PipeWire node and
//! writes scaled RGB24 frames to stdout for the shared reader.
//!
//! Portal calls answer asynchronously: each method returns a request
//! object path, and the outcome arrives as a `Response` signal on that
//! path. The signal subscription must be in place before the call so the
//! response cannot be missed. Steps are bounded at 120 seconds — the user
//! may need time to pick a monitor in the compositor's consent dialog.
//!
//! The portal's PipeWire remote arrives as a file descriptor that must be
//! inherited by the child; it is remapped to fd 3 between fork and exec,
//! and both the fd and the bus connection stay open for the lifetime of
//! the capture session.

use std::collections::HashMap;
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Duration;

use futures::StreamExt;
use tracing::debug;
use zbus::zvariant::{ObjectPath, OwnedValue, Value};
use zbus::{Connection, Proxy};

use crate::capture::{has_executable, ChildFrames, CAPTURE_HEIGHT, CAPTURE_WIDTH};
use crate::color::Rgb;
use crate::error::CoreError;

const PORTAL_DEST: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const SCREENCAST_IFACE: &str = "org.freedesktop.portal.ScreenCast";
const REQUEST_IFACE: &str = "org.freedesktop.portal.Request";

/// Per-step deadline; the user may need to answer a consent dialog.
const PORTAL_TIMEOUT: Duration = Duration::from_secs(120);

/// SelectSources source type: 1 = monitor.
const SOURCE_TYPE_MONITOR: u32 = 1;

pub struct PipeWireCapturer {
    frames: ChildFrames,
    /// PipeWire remote from the portal; the child's fd 3 is a dup of this.
    _pw_fd: OwnedFd,
    /// Keeps the ScreenCast session alive — the portal revokes the stream
    /// when the negotiating connection drops.
    _bus: Connection,
}

impl PipeWireCapturer {
    pub async fn new() -> Result<Self, CoreError> {
        if !has_executable("gst-launch-1.0") {
            return Err(CoreError::Capture("gst-launch-1.0 not found on PATH".into()));
        }

        let (bus, node_id, pw_fd) = acquire_pipewire_node().await?;
        debug!(node_id, "portal screen-cast negotiated");

        let raw_fd = pw_fd.as_raw_fd();
        let mut cmd = std::process::Command::new("gst-launch-1.0");
        cmd.args([
            "-q",
            "pipewiresrc",
            &format!("path={node_id}"),
            "fd=3",
            "!",
            "videoconvert",
            "!",
            "videoscale",
            "!",
            &format!("video/x-raw,format=RGB,width={CAPTURE_WIDTH},height={CAPTURE_HEIGHT}"),
            "!",
            "fdsink",
            "fd=1",
        ]);

        // Between fork and exec, remap the portal fd to the fd number the
        // pipeline was told about. dup2 clears CLOEXEC on the duplicate.
        unsafe {
            use std::os::unix::process::CommandExt;
            cmd.pre_exec(move || {
                if libc::dup2(raw_fd, 3) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let frames = ChildFrames::spawn(tokio::process::Command::from(cmd)).await?;

        Ok(Self {
            frames,
            _pw_fd: pw_fd,
            _bus: bus,
        })
    }

    pub fn capture_color(&self) -> Result<Rgb, CoreError> {
        self.frames.latest_color()
    }

    /// Stop the pipeline; the fd and bus connection are released when the
    /// capturer is dropped, in that order.
    pub async fn close(&self) {
        self.frames.shutdown().await;
    }
}

// ── Portal negotiation ──────────────────────────────────────────────

/// Negotiate a ScreenCast session and return the bus connection (which
/// must stay open), the PipeWire node id, and the remote fd.
async fn acquire_pipewire_node() -> Result<(Connection, u32, OwnedFd), CoreError> {
    let bus = Connection::session()
        .await
        .map_err(|e| CoreError::Portal(format!("connecting to session bus: {e}")))?;

    let portal = Proxy::new(&bus, PORTAL_DEST, PORTAL_PATH, SCREENCAST_IFACE)
        .await
        .map_err(|e| CoreError::Portal(format!("portal proxy: {e}")))?;

    let sender = sender_token(&bus)?;

    // --- CreateSession ---
    let pending = PendingRequest::subscribe(&bus, &sender, "huesync_req_create").await?;
    let options: HashMap<&str, Value> = HashMap::from([
        ("handle_token", Value::from("huesync_req_create")),
        ("session_handle_token", Value::from("huesync_session")),
    ]);
    portal
        .call_method("CreateSession", &(options,))
        .await
        .map_err(|e| CoreError::Portal(format!("CreateSession: {e}")))?;
    let results = pending.wait("CreateSession").await?;

    let session_handle = results
        .get("session_handle")
        .and_then(|v| String::try_from(v.clone()).ok())
        .ok_or_else(|| CoreError::Portal("CreateSession reply lacks session_handle".into()))?;
    let session_path = ObjectPath::try_from(session_handle)
        .map_err(|e| CoreError::Portal(format!("invalid session handle: {e}")))?;

    // --- SelectSources ---
    let pending = PendingRequest::subscribe(&bus, &sender, "huesync_req_select").await?;
    let options: HashMap<&str, Value> = HashMap::from([
        ("handle_token", Value::from("huesync_req_select")),
        ("types", Value::from(SOURCE_TYPE_MONITOR)),
        ("multiple", Value::from(false)),
    ]);
    portal
        .call_method("SelectSources", &(&session_path, options))
        .await
        .map_err(|e| CoreError::Portal(format!("SelectSources: {e}")))?;
    pending.wait("SelectSources").await?;

    // --- Start ---
    let pending = PendingRequest::subscribe(&bus, &sender, "huesync_req_start").await?;
    let options: HashMap<&str, Value> =
        HashMap::from([("handle_token", Value::from("huesync_req_start"))]);
    portal
        .call_method("Start", &(&session_path, "", options))
        .await
        .map_err(|e| CoreError::Portal(format!("Start: {e}")))?;
    let results = pending.wait("Start").await?;

    let node_id = extract_node_id(&results)?;

    // --- OpenPipeWireRemote ---
    let reply = portal
        .call_method(
            "OpenPipeWireRemote",
            &(&session_path, HashMap::<&str, Value>::new()),
        )
        .await
        .map_err(|e| CoreError::Portal(format!("OpenPipeWireRemote: {e}")))?;
    let fd: zbus::zvariant::OwnedFd = reply
        .body()
        .deserialize()
        .map_err(|e| CoreError::Portal(format!("OpenPipeWireRemote reply: {e}")))?;

    Ok((bus, node_id, fd.into()))
}

/// A subscription to one portal request's `Response` signal.
///
/// Created before the method call so the signal cannot race the
/// subscription.
struct PendingRequest<'a> {
    _proxy: Proxy<'a>,
    stream: zbus::proxy::SignalStream<'a>,
}

impl PendingRequest<'_> {
    async fn subscribe(
        bus: &Connection,
        sender: &str,
        token: &str,
    ) -> Result<PendingRequest<'static>, CoreError> {
        let request_path =
            format!("/org/freedesktop/portal/desktop/request/{sender}/{token}");
        let proxy = Proxy::new(bus, PORTAL_DEST, request_path, REQUEST_IFACE)
            .await
            .map_err(|e| CoreError::Portal(format!("request proxy: {e}")))?;
        let stream = proxy
            .receive_signal("Response")
            .await
            .map_err(|e| CoreError::Portal(format!("subscribing to Response: {e}")))?;
        Ok(PendingRequest {
            _proxy: proxy,
            stream,
        })
    }

    /// Wait for the Response signal; a non-zero response code means the
    /// user denied the request or it failed portal-side.
    async fn wait(mut self, step: &str) -> Result<HashMap<String, OwnedValue>, CoreError> {
        let next = tokio::time::timeout(PORTAL_TIMEOUT, self.stream.next());
        match next.await {
            Ok(Some(msg)) => {
                let (code, results): (u32, HashMap<String, OwnedValue>) = msg
                    .body()
                    .deserialize()
                    .map_err(|e| CoreError::Portal(format!("{step} response: {e}")))?;
                if code != 0 {
                    return Err(CoreError::Portal(format!(
                        "{step} denied (response code {code})"
                    )));
                }
                Ok(results)
            }
            Ok(None) => Err(CoreError::Portal(format!("{step}: signal stream closed"))),
            Err(_) => Err(CoreError::Portal(format!(
                "{step}: timed out waiting for portal response"
            ))),
        }
    }
}

/// Convert a unique bus name like `:1.42` into the token the portal uses
/// in request object paths (`1_42`).
fn sender_token(bus: &Connection) -> Result<String, CoreError> {
    let name = bus
        .unique_name()
        .ok_or_else(|| CoreError::Portal("session bus has no unique name".into()))?;
    Ok(name.as_str().trim_start_matches(':').replace('.', "_"))
}

/// Pull the PipeWire node id out of the Start response.
///
/// The `streams` field is typed `a(ua{sv})` — an array of (node id,
/// properties) structs; a single stream is expected since `multiple` was
/// false.
fn extract_node_id(results: &HashMap<String, OwnedValue>) -> Result<u32, CoreError> {
    let streams = results
        .get("streams")
        .ok_or_else(|| CoreError::Portal("Start reply lacks streams".into()))?;

    let Value::Array(entries) = &**streams else {
        return Err(CoreError::Portal("unexpected streams type".into()));
    };
    let Some(first) = entries.iter().next() else {
        return Err(CoreError::Portal("portal returned no streams".into()));
    };
    let Value::Structure(entry) = first else {
        return Err(CoreError::Portal("unexpected stream entry type".into()));
    };
    match entry.fields().first() {
        Some(Value::U32(node_id)) => Ok(*node_id),
        _ => Err(CoreError::Portal("stream entry lacks a node id".into())),
    }
}
