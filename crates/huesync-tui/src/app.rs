//! Application core — the session orchestrator.
//!
//! A single-threaded state machine drives the whole flow:
//!
//! ```text
//! Scanning → SelectingBridge → (Pairing → PairingWait)* → FetchingAreas
//!          → SelectingArea → InputDelay → Activating → Connecting
//!          → Streaming ⇄ (per-frame ticks) → Stopping → Done
//! ```
//!
//! The loop reacts to one event at a time — a keypress, a tick, or a
//! worker completion — and dispatches at most one action in response.
//! Everything that can block runs in a spawned task and reports back
//! through the [`Action`] channel; the streaming loop is cooperative,
//! rescheduling itself only after the previous frame completed.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use huesync_api::{EntertainmentArea, HueClient, TransportConfig};
use huesync_core::{
    discover_bridges, new_capturer, Bridge, CredentialStore, Rgb, Streamer,
};

use crate::action::{Action, SessionParts};
use crate::event::{Event, EventReader};
use crate::theme;
use crate::tui::Tui;

/// How long discovery browses before giving up.
const SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// Fallback when the delay prompt is empty or invalid.
const DEFAULT_DELAY_MS: u64 = 100;

/// Orchestrator states, in flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    SelectingBridge,
    Pairing,
    PairingWait,
    FetchingAreas,
    SelectingArea,
    InputDelay,
    Activating,
    Connecting,
    Streaming,
    Stopping,
    Done,
}

/// Top-level application state and event loop.
pub struct App {
    state: State,
    running: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    throbber: throbber_widgets_tui::ThrobberState,

    store: CredentialStore,
    client: Option<Arc<HueClient>>,

    bridges: Vec<Bridge>,
    bridge_cursor: usize,
    selected_bridge: Option<Bridge>,

    application_key: String,
    client_key: String,
    /// Recoverable pairing hint ("Link button not pressed.", rejection).
    pair_hint: Option<String>,

    areas: Vec<EntertainmentArea>,
    area_cursor: usize,
    selected_area: Option<EntertainmentArea>,

    delay_input: String,
    default_delay_ms: u64,
    capture_delay: Duration,

    session: Option<SessionParts>,
    last_color: Option<Rgb>,
    stream_error: Option<String>,

    /// Fatal error carried out of the TUI and printed to stderr.
    fatal: Option<String>,
}

impl App {
    pub fn new(store: CredentialStore, default_delay_ms: u64) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Self {
            state: State::Scanning,
            running: true,
            action_tx,
            action_rx,
            throbber: throbber_widgets_tui::ThrobberState::default(),
            store,
            client: None,
            bridges: Vec::new(),
            bridge_cursor: 0,
            selected_bridge: None,
            application_key: String::new(),
            client_key: String::new(),
            pair_hint: None,
            areas: Vec::new(),
            area_cursor: 0,
            selected_area: None,
            delay_input: String::new(),
            default_delay_ms,
            capture_delay: Duration::from_millis(DEFAULT_DELAY_MS),
            session: None,
            last_color: None,
            stream_error: None,
            fatal: None,
        }
    }

    /// The fatal error to print after the terminal is restored, if any.
    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;

        let mut events = EventReader::new(
            Duration::from_millis(100), // spinner tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        self.start_scan();

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => self.handle_key_event(key),
                Event::Resize(_, _) => {}
                Event::Tick => self.throbber.calc_next(),
                Event::Render => tui.draw(|frame| self.render(frame))?,
            }

            // Drain and process all queued worker completions
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(action);
            }
        }

        events.stop();
        Ok(())
    }

    // ── Key handling ─────────────────────────────────────────────────

    fn handle_key_event(&mut self, key: KeyEvent) {
        // Quit is global: during streaming it starts a clean shutdown,
        // anywhere else it ends the program.
        let is_quit = matches!(key.code, KeyCode::Char('q'))
            || (key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c')));
        if is_quit {
            match self.state {
                State::Streaming => self.start_stop(),
                State::Stopping => {}
                _ => self.running = false,
            }
            return;
        }

        match self.state {
            State::SelectingBridge => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.bridge_cursor = self.bridge_cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.bridge_cursor + 1 < self.bridges.len() {
                        self.bridge_cursor += 1;
                    }
                }
                KeyCode::Enter => self.select_bridge(self.bridge_cursor),
                _ => {}
            },

            State::Pairing => {
                if key.code == KeyCode::Enter {
                    self.state = State::PairingWait;
                    self.start_pair();
                }
            }

            State::SelectingArea => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.area_cursor = self.area_cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.area_cursor + 1 < self.areas.len() {
                        self.area_cursor += 1;
                    }
                }
                KeyCode::Enter => {
                    self.selected_area = Some(self.areas[self.area_cursor].clone());
                    self.enter_delay_input();
                }
                _ => {}
            },

            State::InputDelay => match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() => self.delay_input.push(c),
                KeyCode::Backspace => {
                    self.delay_input.pop();
                }
                KeyCode::Enter => {
                    let ms = match self.delay_input.parse::<u64>() {
                        Ok(ms) if ms > 0 => ms,
                        _ => DEFAULT_DELAY_MS,
                    };
                    self.capture_delay = Duration::from_millis(ms);
                    self.state = State::Activating;
                    self.start_activate();
                }
                _ => {}
            },

            _ => {}
        }
    }

    // ── Action processing ────────────────────────────────────────────

    fn process_action(&mut self, action: Action) {
        debug!(state = ?self.state, ?action, "processing action");

        match action {
            Action::ScanFinished(Err(e)) => self.fail(format!("discovery failed: {e}")),
            Action::ScanFinished(Ok(bridges)) => {
                if bridges.is_empty() {
                    self.fail("no Hue bridges found on the network".into());
                } else if bridges.len() == 1 {
                    self.bridges = bridges;
                    self.select_bridge(0);
                } else {
                    self.bridges = bridges;
                    self.state = State::SelectingBridge;
                }
            }

            Action::PairFinished(Err(huesync_api::Error::LinkButtonNotPressed)) => {
                self.pair_hint = Some("Link button not pressed.".into());
                self.state = State::Pairing;
            }
            Action::PairFinished(Err(e)) => self.fail(format!("pairing failed: {e}")),
            Action::PairFinished(Ok(creds)) => {
                self.application_key = creds.application_key;
                self.client_key = creds.client_key;
                self.pair_hint = None;

                // Best-effort: pairing succeeded in-memory even if the
                // store write fails.
                if let Some(bridge) = &self.selected_bridge {
                    let stored = huesync_core::BridgeCredentials {
                        application_key: self.application_key.clone(),
                        client_key: self.client_key.clone(),
                    };
                    if let Err(e) = self.store.save(&bridge.id, &stored) {
                        warn!(error = %e, "failed to persist credentials");
                    }
                }

                self.state = State::FetchingAreas;
                self.start_fetch_areas();
            }

            Action::AreasFetched(Err(huesync_api::Error::Unauthorized)) => {
                if let Some(bridge) = &self.selected_bridge {
                    if let Err(e) = self.store.delete(&bridge.id) {
                        warn!(error = %e, "failed to delete rejected credentials");
                    }
                }
                self.application_key.clear();
                self.client_key.clear();
                self.pair_hint = Some("Stored credentials were rejected by the bridge.".into());
                self.state = State::Pairing;
            }
            Action::AreasFetched(Err(e)) => {
                self.fail(format!("fetching entertainment areas: {e}"));
            }
            Action::AreasFetched(Ok(areas)) => {
                if areas.is_empty() {
                    self.fail("no entertainment areas configured on this bridge".into());
                } else if areas.len() == 1 {
                    self.selected_area = Some(areas[0].clone());
                    self.areas = areas;
                    self.enter_delay_input();
                } else {
                    self.areas = areas;
                    self.state = State::SelectingArea;
                }
            }

            Action::AreaActivated(Err(e)) => self.fail(format!("activating area: {e}")),
            Action::AreaActivated(Ok(())) => {
                self.state = State::Connecting;
                self.start_connect();
            }

            Action::SessionConnected(Err(e)) => {
                // Deactivate so the bridge doesn't stay wedged in
                // entertainment mode with no streamer attached.
                self.fatal = Some(format!("connecting: {e}"));
                self.start_stop();
            }
            Action::SessionConnected(Ok(parts)) => {
                self.session = Some(parts);
                self.state = State::Streaming;
                self.start_frame();
            }

            Action::FrameSent(result) => {
                match result {
                    Ok(color) => {
                        self.last_color = Some(color);
                        self.stream_error = None;
                    }
                    Err(e) => self.stream_error = Some(e),
                }
                self.schedule_tick();
            }

            Action::StreamTick => {
                if self.state == State::Streaming {
                    self.start_frame();
                }
            }

            Action::StopFinished(err) => {
                if self.fatal.is_none() {
                    self.fatal = err;
                }
                self.state = State::Done;
                self.running = false;
            }
        }
    }

    fn fail(&mut self, message: String) {
        self.fatal = Some(message);
        self.state = State::Done;
        self.running = false;
    }

    // ── Flow steps ───────────────────────────────────────────────────

    fn select_bridge(&mut self, index: usize) {
        let bridge = self.bridges[index].clone();

        let client = match HueClient::for_bridge(bridge.ip, &TransportConfig::default()) {
            Ok(client) => Arc::new(client),
            Err(e) => return self.fail(format!("bridge client: {e}")),
        };
        self.client = Some(client);

        match self.store.load(&bridge.id) {
            Some(creds) => {
                self.application_key = creds.application_key;
                self.client_key = creds.client_key;
                self.selected_bridge = Some(bridge);
                self.state = State::FetchingAreas;
                self.start_fetch_areas();
            }
            None => {
                self.selected_bridge = Some(bridge);
                self.state = State::Pairing;
            }
        }
    }

    fn enter_delay_input(&mut self) {
        self.delay_input = self.default_delay_ms.to_string();
        self.state = State::InputDelay;
    }

    // ── Worker tasks ─────────────────────────────────────────────────

    fn start_scan(&self) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let (mut bridge_rx, err_rx) = discover_bridges(SCAN_TIMEOUT);

            let mut bridges = Vec::new();
            while let Some(bridge) = bridge_rx.recv().await {
                bridges.push(bridge);
            }

            // The error channel only fires when discovery never started.
            let result = match err_rx.await {
                Ok(err) => Err(err.to_string()),
                Err(_) => Ok(bridges),
            };
            let _ = tx.send(Action::ScanFinished(result));
        });
    }

    fn start_pair(&self) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = client.pair().await;
            let _ = tx.send(Action::PairFinished(result));
        });
    }

    fn start_fetch_areas(&self) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let application_key = self.application_key.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = client.entertainment_areas(&application_key).await;
            let _ = tx.send(Action::AreasFetched(result));
        });
    }

    fn start_activate(&self) {
        let (Some(client), Some(area)) = (self.client.clone(), self.selected_area.as_ref())
        else {
            return;
        };
        let application_key = self.application_key.clone();
        let area_id = area.id.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = client
                .activate(&application_key, &area_id)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Action::AreaActivated(result));
        });
    }

    fn start_connect(&self) {
        let (Some(bridge), Some(area)) =
            (self.selected_bridge.clone(), self.selected_area.clone())
        else {
            return;
        };
        let application_key = self.application_key.clone();
        let client_key = self.client_key.clone();
        let tx = self.action_tx.clone();

        tokio::spawn(async move {
            let (capturer, method) = new_capturer().await;

            let result = match Streamer::connect(
                bridge.ip,
                &application_key,
                &client_key,
                area.id.clone(),
                area.channel_ids.clone(),
            )
            .await
            {
                Ok(streamer) => Ok(SessionParts {
                    streamer: Arc::new(streamer),
                    capturer: Arc::new(capturer),
                    method,
                }),
                Err(e) => {
                    capturer.close().await;
                    Err(e.to_string())
                }
            };
            let _ = tx.send(Action::SessionConnected(result));
        });
    }

    /// One capture → average → send cycle.
    fn start_frame(&self) {
        let Some(session) = &self.session else {
            return;
        };
        let streamer = Arc::clone(&session.streamer);
        let capturer = Arc::clone(&session.capturer);
        let tx = self.action_tx.clone();

        tokio::spawn(async move {
            let result = async {
                // The screen-grab backend reads the framebuffer
                // synchronously; keep it off the async workers.
                let grab = Arc::clone(&capturer);
                let color = tokio::task::spawn_blocking(move || grab.capture_color())
                    .await
                    .map_err(|e| e.to_string())?
                    .map_err(|e| e.to_string())?;
                streamer.send(color).await.map_err(|e| e.to_string())?;
                Ok(color)
            }
            .await;
            let _ = tx.send(Action::FrameSent(result));
        });
    }

    fn schedule_tick(&self) {
        if self.state != State::Streaming {
            return;
        }
        let delay = self.capture_delay;
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Action::StreamTick);
        });
    }

    /// Close the transport and capturer, then best-effort deactivate.
    fn start_stop(&mut self) {
        self.state = State::Stopping;

        let session = self.session.take();
        let client = self.client.clone();
        let application_key = self.application_key.clone();
        let area_id = self.selected_area.as_ref().map(|a| a.id.clone());
        let tx = self.action_tx.clone();

        tokio::spawn(async move {
            let mut first_err = None;

            if let Some(session) = session {
                if let Err(e) = session.streamer.close().await {
                    first_err = Some(e.to_string());
                }
                session.capturer.close().await;
            }

            if let (Some(client), Some(area_id)) = (client, area_id) {
                if let Err(e) = client.deactivate(&application_key, &area_id).await {
                    if first_err.is_none() {
                        first_err = Some(format!("deactivating area: {e}"));
                    }
                }
            }

            let _ = tx.send(Action::StopFinished(first_err));
        });
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let layout = Layout::vertical([
            Constraint::Length(1), // top padding
            Constraint::Min(1),    // content
            Constraint::Length(1), // key hints
        ])
        .split(area);

        match self.state {
            State::Scanning => self.render_spinner(frame, layout[1], "Scanning for Hue bridges..."),
            State::SelectingBridge => self.render_bridge_list(frame, layout[1]),
            State::Pairing => self.render_pairing(frame, layout[1]),
            State::PairingWait => self.render_spinner(frame, layout[1], "Pairing with bridge..."),
            State::FetchingAreas => {
                self.render_spinner(frame, layout[1], "Fetching entertainment areas...");
            }
            State::SelectingArea => self.render_area_list(frame, layout[1]),
            State::InputDelay => self.render_delay_input(frame, layout[1]),
            State::Activating => {
                self.render_spinner(frame, layout[1], "Activating entertainment area...");
            }
            State::Connecting => {
                self.render_spinner(frame, layout[1], "Connecting to bridge (DTLS)...");
            }
            State::Streaming => self.render_streaming(frame, layout[1]),
            State::Stopping => self.render_spinner(frame, layout[1], "Stopping..."),
            State::Done => {}
        }

        self.render_key_hints(frame, layout[2]);
    }

    fn render_spinner(&mut self, frame: &mut Frame, area: Rect, label: &str) {
        let throbber = throbber_widgets_tui::Throbber::default()
            .label(format!(" {label}"))
            .style(theme::title())
            .throbber_style(theme::spinner());
        let row = Rect::new(area.x + 1, area.y, area.width.saturating_sub(1), 1);
        frame.render_stateful_widget(throbber, row, &mut self.throbber);
    }

    fn render_bridge_list(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(Span::styled("  Select a Hue Bridge:", theme::title())),
            Line::from(""),
        ];
        for (i, bridge) in self.bridges.iter().enumerate() {
            let label = format!("{} ({}) — {}", bridge.name, bridge.id, bridge.ip);
            lines.push(cursor_line(label, i == self.bridge_cursor));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_pairing(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        if let Some(hint) = &self.pair_hint {
            lines.push(Line::from(Span::styled(format!("  {hint}"), theme::error())));
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            "  Press the link button on your Hue bridge, then press Enter.",
            theme::title(),
        )));
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_area_list(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(Span::styled("  Select an Entertainment Area:", theme::title())),
            Line::from(""),
        ];
        for (i, entry) in self.areas.iter().enumerate() {
            lines.push(cursor_line(entry.to_string(), i == self.area_cursor));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_delay_input(&self, frame: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(Span::styled("  Capture delay (ms):", theme::title())),
            Line::from(""),
            Line::from(format!("  > {}\u{2588}", self.delay_input)),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_streaming(&self, frame: &mut Frame, area: Rect) {
        let bridge = self
            .selected_bridge
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let area_label = self
            .selected_area
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let method = self.session.as_ref().map_or("", |s| s.method);

        let mut lines = vec![
            Line::from(Span::styled("  Streaming", theme::title())),
            Line::from(""),
            Line::from(format!("  Bridge:  {bridge}")),
            Line::from(format!("  Area:    {area_label}")),
            Line::from(format!("  Capture: {method}")),
            Line::from(format!("  Delay:   {}ms", self.capture_delay.as_millis())),
        ];

        match self.last_color {
            Some(color) => lines.push(Line::from(vec![
                Span::raw("  Color:   "),
                Span::styled(
                    "\u{2588}\u{2588}",
                    ratatui::style::Style::default()
                        .fg(ratatui::style::Color::Rgb(color.r, color.g, color.b)),
                ),
                Span::raw(format!(" {color}")),
            ])),
            None => lines.push(Line::from("  Color:   (waiting for first frame)")),
        }

        if let Some(err) = &self.stream_error {
            lines.push(Line::from(Span::styled(
                format!("  Error:   {err}"),
                theme::error(),
            )));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_key_hints(&self, frame: &mut Frame, area: Rect) {
        let hints = match self.state {
            State::SelectingBridge | State::SelectingArea => {
                "  ↑/k up · ↓/j down · enter select · q quit"
            }
            State::Pairing => "  enter pair · q quit",
            State::InputDelay => "  type a number · enter confirm · q quit",
            State::Streaming => "  q quit",
            _ => "  q quit",
        };
        frame.render_widget(
            Paragraph::new(Span::styled(hints, theme::key_hint())),
            area,
        );
    }
}

/// A list row with the selection cursor.
fn cursor_line(label: String, selected: bool) -> Line<'static> {
    if selected {
        Line::from(Span::styled(format!("  ▸ {label}"), theme::selected_item()))
    } else {
        Line::from(Span::styled(format!("    {label}"), theme::item()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huesync_core::BridgeCredentials;

    fn test_app() -> (tempfile::TempDir, App) {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::with_dir(tmp.path().join("creds"));
        (tmp, App::new(store, 100))
    }

    fn test_bridge() -> Bridge {
        Bridge {
            id: "001788fffe4d2e90".into(),
            model: "BSB002".into(),
            name: "Hue Bridge".into(),
            ip: "192.168.1.50".parse().unwrap(),
            port: 443,
            hostname: "bridge.local.".into(),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn scan_with_zero_bridges_is_fatal() {
        let (_tmp, mut app) = test_app();

        app.process_action(Action::ScanFinished(Ok(Vec::new())));

        assert_eq!(app.state, State::Done);
        assert!(app.fatal_error().unwrap().contains("no Hue bridges"));
    }

    #[tokio::test]
    async fn unpaired_bridge_enters_pairing() {
        let (_tmp, mut app) = test_app();

        app.process_action(Action::ScanFinished(Ok(vec![test_bridge()])));

        assert_eq!(app.state, State::Pairing);
        assert!(app.selected_bridge.is_some());
    }

    #[tokio::test]
    async fn paired_bridge_skips_pairing() {
        let (_tmp, mut app) = test_app();
        app.store
            .save(
                &test_bridge().id,
                &BridgeCredentials {
                    application_key: "U".into(),
                    client_key: "K".into(),
                },
            )
            .unwrap();

        app.process_action(Action::ScanFinished(Ok(vec![test_bridge()])));

        assert_eq!(app.state, State::FetchingAreas);
        assert_eq!(app.application_key, "U");
        assert_eq!(app.client_key, "K");
    }

    #[tokio::test]
    async fn link_button_not_pressed_returns_to_pairing_with_hint() {
        let (_tmp, mut app) = test_app();
        app.state = State::PairingWait;

        app.process_action(Action::PairFinished(Err(
            huesync_api::Error::LinkButtonNotPressed,
        )));

        assert_eq!(app.state, State::Pairing);
        assert_eq!(app.pair_hint.as_deref(), Some("Link button not pressed."));
        assert!(app.fatal_error().is_none());
    }

    #[tokio::test]
    async fn pair_success_saves_credentials() {
        let (_tmp, mut app) = test_app();
        app.selected_bridge = Some(test_bridge());
        app.state = State::PairingWait;

        app.process_action(Action::PairFinished(Ok(huesync_api::PairedCredentials {
            application_key: "U".into(),
            client_key: "0123456789ABCDEF0123456789ABCDEF".into(),
        })));

        assert_eq!(app.state, State::FetchingAreas);
        let stored = app.store.load(&test_bridge().id).unwrap();
        assert_eq!(stored.application_key, "U");
        assert_eq!(stored.client_key, "0123456789ABCDEF0123456789ABCDEF");
    }

    #[tokio::test]
    async fn rejected_credentials_are_deleted_and_repair_starts() {
        let (_tmp, mut app) = test_app();
        let bridge = test_bridge();
        app.store
            .save(
                &bridge.id,
                &BridgeCredentials {
                    application_key: "stale".into(),
                    client_key: "stale".into(),
                },
            )
            .unwrap();
        app.selected_bridge = Some(bridge.clone());
        app.application_key = "stale".into();
        app.client_key = "stale".into();
        app.state = State::FetchingAreas;

        app.process_action(Action::AreasFetched(Err(huesync_api::Error::Unauthorized)));

        assert_eq!(app.state, State::Pairing);
        assert!(app.application_key.is_empty());
        assert!(app.client_key.is_empty());
        assert_eq!(
            app.pair_hint.as_deref(),
            Some("Stored credentials were rejected by the bridge.")
        );
        assert_eq!(app.store.load(&bridge.id), None);
    }

    #[tokio::test]
    async fn zero_areas_is_fatal() {
        let (_tmp, mut app) = test_app();
        app.state = State::FetchingAreas;

        app.process_action(Action::AreasFetched(Ok(Vec::new())));

        assert_eq!(app.state, State::Done);
        assert!(app.fatal_error().unwrap().contains("no entertainment areas"));
    }

    #[tokio::test]
    async fn single_area_auto_selects_into_delay_prompt() {
        let (_tmp, mut app) = test_app();
        app.state = State::FetchingAreas;

        let area = EntertainmentArea {
            id: "abcdefgh-1234-5678-9abc-def012345678".into(),
            name: "TV Wall".into(),
            kind: "screen".into(),
            status: "inactive".into(),
            channel_ids: vec![0, 3],
            light_count: 2,
        };
        app.process_action(Action::AreasFetched(Ok(vec![area.clone()])));

        assert_eq!(app.state, State::InputDelay);
        assert_eq!(app.selected_area, Some(area));
        assert_eq!(app.delay_input, "100");
    }

    #[tokio::test]
    async fn invalid_delay_falls_back_to_default() {
        let (_tmp, mut app) = test_app();
        app.state = State::InputDelay;
        app.delay_input = String::new();

        app.handle_key_event(key(KeyCode::Enter));

        assert_eq!(app.state, State::Activating);
        assert_eq!(app.capture_delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn zero_delay_falls_back_to_default() {
        let (_tmp, mut app) = test_app();
        app.state = State::InputDelay;
        app.delay_input = "0".into();

        app.handle_key_event(key(KeyCode::Enter));

        assert_eq!(app.capture_delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn typed_delay_is_used() {
        let (_tmp, mut app) = test_app();
        app.state = State::InputDelay;
        app.delay_input.clear();

        for c in ['2', '5', '0'] {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
        app.handle_key_event(key(KeyCode::Enter));

        assert_eq!(app.capture_delay, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn frame_error_does_not_tear_down_streaming() {
        let (_tmp, mut app) = test_app();
        app.state = State::Streaming;

        app.process_action(Action::FrameSent(Err("writing to DTLS: closed".into())));

        assert_eq!(app.state, State::Streaming);
        assert_eq!(
            app.stream_error.as_deref(),
            Some("writing to DTLS: closed")
        );

        app.process_action(Action::FrameSent(Ok(Rgb::new(1, 2, 3))));
        assert_eq!(app.last_color, Some(Rgb::new(1, 2, 3)));
        assert!(app.stream_error.is_none());
    }

    #[tokio::test]
    async fn stop_completion_ends_the_run() {
        let (_tmp, mut app) = test_app();
        app.state = State::Stopping;

        app.process_action(Action::StopFinished(Some("deactivating area: HTTP 500".into())));

        assert_eq!(app.state, State::Done);
        assert!(!app.running);
        assert_eq!(
            app.fatal_error(),
            Some("deactivating area: HTTP 500")
        );
    }

    #[tokio::test]
    async fn connect_failure_enters_stopping() {
        let (_tmp, mut app) = test_app();
        app.state = State::Connecting;

        app.process_action(Action::SessionConnected(Err("handshake timed out".into())));

        assert_eq!(app.state, State::Stopping);
        assert!(app.fatal_error().unwrap().contains("handshake timed out"));
    }
}
