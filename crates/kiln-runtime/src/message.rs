//! Handler results and where they go.
//!
//! Handlers return either plain data, which is broadcast, or a
//! `[data, target]` pair addressed to a client, a room, or a client in a
//! room. A pair whose target is an object naming neither id goes nowhere.

use serde_json::Value;

/// Destination of an addressed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A client in the default room
    Client(String),
    /// Every client in a room
    Room(String),
    /// One client in a specific room
    Both { room_id: String, client_id: String },
}

impl Target {
    /// Decode a target: a string or number names a client, an object may
    /// carry `room_id` and/or `client_id`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(id) => Some(Self::Client(id.clone())),
            Value::Number(id) => Some(Self::Client(id.to_string())),
            Value::Object(map) => {
                let room = map.get("room_id").and_then(id_string);
                let client = map.get("client_id").and_then(id_string);
                match (room, client) {
                    (Some(room_id), Some(client_id)) => Some(Self::Both { room_id, client_id }),
                    (Some(room_id), None) => Some(Self::Room(room_id)),
                    (None, Some(client_id)) => Some(Self::Client(client_id)),
                    (None, None) => None,
                }
            }
            _ => None,
        }
    }
}

/// Identifier from a string or number; empty strings and `null` count as absent.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A handler result ready for routing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Broadcast(Value),
    Addressed { data: Value, target: Target },
    /// A pair with an object target that names no room or client
    Discarded(Value),
}

impl Outbound {
    /// Interpret a handler result.
    ///
    /// A two-element array whose second element is a valid target is
    /// addressed. If that element is an object without ids the message is
    /// discarded. Anything else is broadcast as-is.
    pub fn from_value(value: Value) -> Self {
        if let Value::Array(items) = &value {
            if let [data, target] = items.as_slice() {
                match Target::from_value(target) {
                    Some(target) => {
                        return Self::Addressed {
                            data: data.clone(),
                            target,
                        };
                    }
                    None if target.is_object() => return Self::Discarded(data.clone()),
                    None => {}
                }
            }
        }
        Self::Broadcast(value)
    }

    /// Wire text of the data part.
    pub fn payload(&self) -> String {
        match self {
            Self::Broadcast(data) | Self::Addressed { data, .. } | Self::Discarded(data) => {
                data.to_string()
            }
        }
    }
}
