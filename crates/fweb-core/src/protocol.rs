#![forbid(unsafe_code)]

//! JSON wire protocol between a client and its browser runtime.
//!
//! # Design
//!
//! Every outbound payload travels inside a [`Frame`] carrying a per-client
//! sequence number. The browser remembers the last sequence it applied and
//! presents it in its [`Inbound::Handshake`] when it reconnects, which lets
//! the server replay newer frames from its history or answer with
//! [`Outbound::HistoryExhausted`].
//!
//! Element updates always carry the complete serialized state of the element
//! (`Some(state)`) or `None` for a deleted element. There are no field diffs.
//!
//! # Example
//!
//! ```
//! use fweb_core::protocol::{Frame, Outbound};
//!
//! let frame = Frame { seq: 0, message: Outbound::HistoryExhausted };
//! let json = serde_json::to_string(&frame).unwrap();
//! assert_eq!(json, r#"{"seq":0,"type":"history_exhausted"}"#);
//! ```

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ClientId, ElementId, ListenerId, RequestId};

// ─── Element state ───────────────────────────────────────────────────────────

/// Full serialized state of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    pub id: ElementId,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "class")]
    pub classes: Vec<String>,
    pub style: IndexMap<String, String>,
    pub props: IndexMap<String, Value>,
    /// Named slots other than `default`.
    pub slots: IndexMap<String, SlotState>,
    /// Children of the `default` slot.
    pub children: Vec<ElementId>,
    pub events: Vec<ListenerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotState {
    pub ids: Vec<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Browser-side description of an event listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerState {
    pub id: ListenerId,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event fields forwarded to the server; `None` forwards everything.
    pub args: Option<Vec<String>>,
    /// Minimum seconds between two forwarded events.
    pub throttle: f64,
    pub leading: bool,
    pub trailing: bool,
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    Bottom,
    BottomRight,
    Top,
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyType {
    Positive,
    Negative,
    Warning,
    Info,
    Ongoing,
}

/// Toast notification options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyOptions {
    pub message: String,
    pub position: NotifyPosition,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NotifyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub timeout_ms: u64,
    #[serde(rename = "closeBtn", default, skip_serializing_if = "Option::is_none")]
    pub close_button: Option<String>,
    #[serde(rename = "multiLine", default)]
    pub multi_line: bool,
    /// Additional options passed through untouched.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl NotifyOptions {
    pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: NotifyPosition::default(),
            kind: None,
            color: None,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            close_button: None,
            multi_line: false,
            extra: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn position(mut self, position: NotifyPosition) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: NotifyType) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn close_button(mut self, label: impl Into<String>) -> Self {
        self.close_button = Some(label.into());
        self
    }

    #[must_use]
    pub fn multi_line(mut self, multi_line: bool) -> Self {
        self.multi_line = multi_line;
        self
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

// ─── Outbound ────────────────────────────────────────────────────────────────

/// Server → browser message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Created, updated (`Some`) or deleted (`None`) elements.
    Update {
        elements: BTreeMap<ElementId, Option<ElementState>>,
    },
    RunScript {
        correlation_id: RequestId,
        code: String,
    },
    Notify { options: NotifyOptions },
    /// Application-defined message kinds (downloads, navigation, ...).
    Custom { kind: String, payload: Value },
    /// The reconnect marker predates the retained history; reload the page.
    /// Always sent with seq 0, which no delivered frame uses.
    HistoryExhausted,
}

impl Outbound {
    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Update { .. } => "update",
            Self::RunScript { .. } => "run_script",
            Self::Notify { .. } => "notify",
            Self::Custom { kind, .. } => kind,
            Self::HistoryExhausted => "history_exhausted",
        }
    }
}

/// One sequenced outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub seq: u64,
    #[serde(flatten)]
    pub message: Outbound,
}

// ─── Inbound ─────────────────────────────────────────────────────────────────

/// Browser → server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// First message on every socket.
    Handshake {
        client_id: ClientId,
        #[serde(default)]
        last_seq: Option<u64>,
    },
    Event(EventMessage),
    ScriptResponse(ScriptResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub element_id: ElementId,
    pub listener_id: ListenerId,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptResponse {
    pub correlation_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
