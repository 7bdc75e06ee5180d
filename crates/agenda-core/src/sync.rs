use crate::navigation::{self, NavCommand};
use crate::pipeline::{FallbackStore, RenderPipeline};
use crate::protocol::ClientRequest;
use crate::transform::{transform, TransformPolicy};
use crate::widget::CalendarWidget;
use crate::{parse_snapshot, NormalizedEvent};
use chrono::{DateTime, Local};
use std::fmt;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Errored => "errored",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle and data events reported by the transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connecting,
    Opened,
    Message(String),
    Closed(Option<String>),
    Errored(String),
}

/// Application state for one calendar view: the widget, its fallback store,
/// the transform policy and the connection state.
pub struct SyncController<W, S> {
    widget: W,
    store: S,
    policy: TransformPolicy,
    state: ConnectionState,
    snapshots_applied: u64,
    last_snapshot_at: Option<DateTime<Local>>,
    last_error: Option<String>,
}

impl<W, S> SyncController<W, S>
where
    W: CalendarWidget,
    S: FallbackStore,
{
    pub fn new(widget: W, store: S, policy: TransformPolicy) -> Self {
        Self {
            widget,
            store,
            policy,
            state: ConnectionState::Connecting,
            snapshots_applied: 0,
            last_snapshot_at: None,
            last_error: None,
        }
    }

    /// Shows the last persisted event set. Does not write the store back.
    pub fn seed_from_store(&mut self) -> usize {
        let events = self.store.load();
        self.widget.clear();
        self.widget.create_events(&events);
        info!("seeded {} events from fallback store", events.len());
        events.len()
    }

    /// Advances the connection state machine. Returns the request to send
    /// back over the transport, if any.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> Option<ClientRequest> {
        match event {
            ConnectionEvent::Connecting => {
                self.state = ConnectionState::Connecting;
                debug!("ws_connecting");
                None
            }
            ConnectionEvent::Opened => {
                self.state = ConnectionState::Open;
                self.last_error = None;
                info!("ws_open; requesting agenda");
                Some(ClientRequest::GetAgenda)
            }
            ConnectionEvent::Message(payload) => {
                self.apply_payload(&payload);
                None
            }
            ConnectionEvent::Closed(reason) => {
                self.state = ConnectionState::Closed;
                let reason = reason.unwrap_or_else(|| "no reason".to_string());
                warn!("ws_closed: {reason}; calendar remains read-only");
                self.last_error = Some(format!("connection closed: {reason}"));
                None
            }
            ConnectionEvent::Errored(err) => {
                self.state = ConnectionState::Errored;
                error!("ws_error: {err}");
                self.last_error = Some(format!("connection error: {err}"));
                None
            }
        }
    }

    fn apply_payload(&mut self, payload: &str) {
        let items = match parse_snapshot(payload) {
            Ok(items) => items,
            Err(err) => {
                warn!("snapshot_parse_error: {err}; payload_len={}", payload.len());
                self.last_error = Some(err.to_string());
                return;
            }
        };
        let events = transform(&items, &self.policy);
        self.snapshots_applied += 1;
        self.last_snapshot_at = Some(Local::now());
        if let Err(err) = RenderPipeline::apply(&mut self.widget, &mut self.store, &events) {
            warn!("fallback_save_error: {err}");
            self.last_error = Some(err.to_string());
            return;
        }
        self.last_error = None;
        debug!("snapshot_applied: {}", describe(&events));
    }

    pub fn on_key(&mut self, key: char, text_input_focused: bool) -> Option<NavCommand> {
        navigation::on_key(&mut self.widget, key, text_input_focused)
    }

    /// Periodic re-layout; never touches data or the connection.
    pub fn refresh(&mut self) {
        self.widget.render();
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn policy(&self) -> &TransformPolicy {
        &self.policy
    }

    pub fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }

    pub fn last_snapshot_at(&self) -> Option<DateTime<Local>> {
        self.last_snapshot_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

pub fn describe(events: &[NormalizedEvent]) -> String {
    let all_day = events.iter().filter(|event| event.is_all_day()).count();
    format!("{} events ({} all-day)", events.len(), all_day)
}
