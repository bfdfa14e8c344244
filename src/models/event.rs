//! Inbound events and outbound frames of the Pusher wire protocol.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An event received over the realtime connection.
///
/// Keeps the whole frame so arbitrary top-level properties stay reachable through
/// [`PusherEvent::property`].
#[derive(Debug, Clone, PartialEq)]
pub struct PusherEvent {
    event_name: String,
    channel_name: Option<String>,
    data: Option<String>,
    user_id: Option<String>,
    payload: Map<String, Value>,
}

impl PusherEvent {
    /// Parse a raw text frame. Fails if the frame is not a JSON object with an `event` string.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let payload: Map<String, Value> = serde_json::from_str(text)?;
        Self::from_payload(payload).ok_or_else(|| {
            serde::de::Error::custom("frame has no \"event\" string")
        })
    }

    pub fn from_payload(payload: Map<String, Value>) -> Option<Self> {
        let event_name = payload.get("event")?.as_str()?.to_string();
        let channel_name = payload
            .get("channel")
            .and_then(Value::as_str)
            .map(String::from);
        let data = match payload.get("data") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        let user_id = payload
            .get("user_id")
            .and_then(Value::as_str)
            .map(String::from);
        Some(Self {
            event_name,
            channel_name,
            data,
            user_id,
            payload,
        })
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.channel_name.as_deref()
    }

    /// Event data as a string. Non-string JSON data is re-serialized.
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Any top-level property of the frame, including `event`, `channel` and `data`.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Parse `data` as JSON. `None` when there is no data or it is not valid JSON.
    pub fn data_to_json(&self) -> Option<Value> {
        serde_json::from_str(self.data.as_deref()?).ok()
    }
}

/// Frame sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum ClientMessage {
    #[serde(rename = "pusher:subscribe")]
    Subscribe { data: SubscribePayload },
    #[serde(rename = "pusher:unsubscribe")]
    Unsubscribe { data: UnsubscribePayload },
    #[serde(rename = "pusher:pong")]
    Pong { data: Map<String, Value> },
}

impl ClientMessage {
    pub fn subscribe(channel: &str, auth: Option<String>, channel_data: Option<String>) -> Self {
        ClientMessage::Subscribe {
            data: SubscribePayload {
                channel: channel.to_string(),
                auth,
                channel_data,
            },
        }
    }

    pub fn unsubscribe(channel: &str) -> Self {
        ClientMessage::Unsubscribe {
            data: UnsubscribePayload {
                channel: channel.to_string(),
            },
        }
    }

    /// Reply to a server `pusher:ping`.
    pub fn pong() -> Self {
        ClientMessage::Pong { data: Map::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscribePayload {
    pub channel: String,
    /// For private/presence: `<app_key>:<signature>` from the auth endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// For presence: the JSON-encoded member info that was signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnsubscribePayload {
    pub channel: String,
}

/// Payload of a `pusher:error` frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PusherError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl PusherError {
    pub fn from_event(event: &PusherEvent) -> Self {
        event
            .data_to_json()
            .or_else(|| event.property("data").cloned())
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_else(|| PusherError {
                code: None,
                message: event.data().unwrap_or_default().to_string(),
            })
    }
}

/// `data` of `pusher:connection_established`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConnectionEstablished {
    pub socket_id: String,
    #[serde(default)]
    pub activity_timeout: Option<u64>,
}
