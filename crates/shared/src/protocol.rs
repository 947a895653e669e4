//! Order feed wire protocol.
//!
//! Frames are JSON objects discriminated by a `type` field. The server side is
//! loose about field types (ids, names and cell values arrive as strings or
//! numbers, timestamps are not always numeric), so inbound frames are decoded
//! into a permissive raw shape first and then classified into
//! [`InboundMessage`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameError;

/// Actor reported by the server when an edit carries no `user_id`.
pub const SYSTEM_ACTOR: &str = "system";

/// Frames sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Liveness check, answered by the server with `pong`
    Ping,
}

impl OutboundFrame {
    pub fn to_json(&self) -> String {
        match self {
            // Unit variants of an internally tagged enum cannot fail to serialize.
            OutboundFrame::Ping => r#"{"type":"ping"}"#.to_string(),
        }
    }
}

/// Logical names of the cached queries the feed can invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryKey {
    OrdersOverview,
    PendingOrders,
    AllOrders,
}

impl QueryKey {
    /// Every query derived from the order sheet.
    pub const ORDER_VIEWS: [QueryKey; 3] = [
        QueryKey::OrdersOverview,
        QueryKey::PendingOrders,
        QueryKey::AllOrders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKey::OrdersOverview => "orders-overview",
            QueryKey::PendingOrders => "pending-orders",
            QueryKey::AllOrders => "all-orders",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Sent once by the server after the socket is accepted
    ConnectionStatus {
        status: Option<String>,
        message: Option<String>,
    },
    /// Answer to our `ping`
    HeartbeatAck,
    /// The server's own idle check
    ServerPing,
    /// The server echoing a non-ping client frame back
    Echo,
    DataUpdate(DataUpdate),
    CellEdit(CellEdit),
    Unknown { kind: String },
}

/// Sub-kind of a `data_update` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    /// Periodic dashboard aggregate refresh (`overview`)
    Overview,
    /// A new order row was appended (`new_order`)
    NewOrder,
    /// An existing row was rewritten (`row_update`)
    RowUpdate,
    /// A bulk action finished (`<action>_completed`)
    ActionCompleted { action: String },
    Other(String),
}

impl UpdateKind {
    fn from_wire(update_type: &str) -> Self {
        match update_type {
            "overview" => UpdateKind::Overview,
            "new_order" => UpdateKind::NewOrder,
            "row_update" => UpdateKind::RowUpdate,
            other => match other.strip_suffix("_completed") {
                Some(action) if !action.is_empty() => UpdateKind::ActionCompleted {
                    action: action.to_string(),
                },
                _ => UpdateKind::Other(other.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataUpdate {
    pub kind: UpdateKind,
    pub payload: Option<Value>,
    pub timestamp: Option<f64>,
}

impl DataUpdate {
    /// `pending_orders` from an overview payload, when present and numeric.
    pub fn pending_orders(&self) -> Option<i64> {
        self.payload.as_ref()?.get("pending_orders")?.as_i64()
    }

    /// `count` from a bulk-action payload.
    pub fn affected_count(&self) -> Option<u64> {
        self.payload.as_ref()?.get("count")?.as_u64()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub actor: String,
    pub row_id: Option<String>,
    pub column: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub timestamp: Option<f64>,
}

/// Permissive decoding target for every frame kind.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    update_type: Option<Value>,
    data: Option<Value>,
    status: Option<Value>,
    message: Option<Value>,
    row_id: Option<Value>,
    column: Option<Value>,
    old_value: Option<Value>,
    new_value: Option<Value>,
    user_id: Option<Value>,
    timestamp: Option<Value>,
}

impl InboundMessage {
    /// Parse and classify a text frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let kind = raw.kind.clone().ok_or(FrameError::MissingType)?;
        // Timestamps that are not plain numbers are dropped, not rejected.
        let timestamp = raw.timestamp.as_ref().and_then(Value::as_f64);

        let message = match kind.as_str() {
            "connection_status" => InboundMessage::ConnectionStatus {
                status: raw.status.as_ref().and_then(scalar_to_string),
                message: raw.message.as_ref().and_then(scalar_to_string),
            },
            "pong" => InboundMessage::HeartbeatAck,
            "ping" => InboundMessage::ServerPing,
            "echo" => InboundMessage::Echo,
            "data_update" => {
                let update_type = raw
                    .update_type
                    .as_ref()
                    .and_then(scalar_to_string)
                    .ok_or(FrameError::MissingField {
                        kind: "data_update",
                        field: "update_type",
                    })?;
                InboundMessage::DataUpdate(DataUpdate {
                    kind: UpdateKind::from_wire(&update_type),
                    payload: raw.data,
                    timestamp,
                })
            }
            "cell_edit" => InboundMessage::CellEdit(CellEdit {
                actor: raw
                    .user_id
                    .as_ref()
                    .and_then(scalar_to_string)
                    .unwrap_or_else(|| SYSTEM_ACTOR.to_string()),
                row_id: raw.row_id.as_ref().and_then(scalar_to_string),
                column: raw.column.as_ref().and_then(scalar_to_string).unwrap_or_default(),
                old_value: raw.old_value.as_ref().and_then(scalar_to_string),
                new_value: raw.new_value.as_ref().and_then(scalar_to_string),
                timestamp,
            }),
            _ => InboundMessage::Unknown { kind },
        };

        Ok(message)
    }

    /// Short label used in logs.
    pub fn label(&self) -> &str {
        match self {
            InboundMessage::ConnectionStatus { .. } => "connection_status",
            InboundMessage::HeartbeatAck => "pong",
            InboundMessage::ServerPing => "ping",
            InboundMessage::Echo => "echo",
            InboundMessage::DataUpdate(_) => "data_update",
            InboundMessage::CellEdit(_) => "cell_edit",
            InboundMessage::Unknown { kind } => kind,
        }
    }
}

/// Strings pass through, numbers and booleans are rendered, null and
/// containers are treated as absent.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
