//! JSON messages exchanged with a robot bridge
//!
//! The bridge owns the robot's encrypted session. Each request carries a
//! UUID that the bridge echoes in its response; notifications carry no id.

use crate::transport::TransportEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Request sent to the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub method: Method,
    #[serde(rename = "devId")]
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Bridge methods
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Connect,
    Disconnect,
    Find,
    Get,
    Set,
}

/// Message received from the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Incoming {
    Response(Response),
    Event(Notification),
}

/// Reply to a [`Request`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Unsolicited notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub event: EventName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EventName {
    Connected,
    Disconnected,
    Error,
    DpRefresh,
    Data,
}

impl Request {
    /// Create a new request for the given device
    pub fn new(method: Method, device_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            device_id: device_id.into(),
            data: None,
        }
    }

    /// Set the request data
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl Notification {
    pub fn into_event(self) -> TransportEvent {
        let data = self.data.unwrap_or(Value::Null);
        match self.event {
            EventName::Connected => TransportEvent::Connected,
            EventName::Disconnected => TransportEvent::Disconnected,
            EventName::Error => TransportEvent::Error(match data {
                Value::String(message) => message,
                other => other.to_string(),
            }),
            EventName::DpRefresh => TransportEvent::DpRefresh(data),
            EventName::Data => TransportEvent::Data(data),
        }
    }
}
