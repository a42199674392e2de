//! Inbound frame types.
//!
//! Every frame from the device is an envelope `{event, data}`. The frame is
//! classified in this order:
//!
//! | Outer event | Meaning |
//! |-------------|---------|
//! | `ms.channel.connect` | Channel accepted; `data.token` may carry a new pairing token |
//! | `ms.channel.ready` | Channel ready for requests |
//! | `ms.channel.unauthorized` | Pairing denied |
//! | `d2d_service_message` | Double-encoded response or notification |
//! | anything else | Unsolicited notification |
//!
//! Known art notifications include `art_mode_changed`, `image_selected`,
//! `image_added`, `image_deleted`, `go_to_standby`, `wakeup`,
//! `recently_set_updated` and `set_brightness`.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::Response;

// ============================================================================
// Constants
// ============================================================================

/// Channel accepted.
pub const CHANNEL_CONNECT_EVENT: &str = "ms.channel.connect";

/// Channel ready.
pub const CHANNEL_READY_EVENT: &str = "ms.channel.ready";

/// Pairing denied.
pub const CHANNEL_UNAUTHORIZED_EVENT: &str = "ms.channel.unauthorized";

/// Service message carrying responses and notifications.
pub const SERVICE_MESSAGE_EVENT: &str = "d2d_service_message";

// ============================================================================
// Wire Shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct ServiceMessage {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

// ============================================================================
// Notification
// ============================================================================

/// An unsolicited event from the device.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Event name.
    pub event: String,

    /// Event data.
    pub payload: Value,
}

impl Notification {
    /// Gets a string field of the payload.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Channel accepted.
    ChannelConnect {
        /// Pairing token, when the device issued one.
        token: Option<String>,
    },

    /// Channel ready.
    ChannelReady,

    /// Pairing denied.
    Unauthorized,

    /// Response to a request.
    Response(Response),

    /// Unsolicited event.
    Notification(Notification),

    /// Service message with a blank `request_id`.
    Stray {
        /// The raw ID.
        request_id: String,
    },
}

impl Inbound {
    /// Decodes and classifies one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the envelope or the nested service
    /// message is malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| Error::protocol(format!("malformed envelope: {e}")))?;

        match envelope.event.as_str() {
            CHANNEL_CONNECT_EVENT => {
                let token = envelope
                    .data
                    .get("token")
                    .and_then(Value::as_str)
                    .filter(|token| !token.is_empty())
                    .map(str::to_string);
                Ok(Self::ChannelConnect { token })
            }
            CHANNEL_READY_EVENT => Ok(Self::ChannelReady),
            CHANNEL_UNAUTHORIZED_EVENT => Ok(Self::Unauthorized),
            SERVICE_MESSAGE_EVENT => Self::parse_service_message(&envelope.data),
            _ => Ok(Self::Notification(Notification {
                event: envelope.event,
                payload: envelope.data,
            })),
        }
    }

    fn parse_service_message(data: &Value) -> Result<Self> {
        let Value::String(raw) = data else {
            return Err(Error::protocol("service message data is not a string"));
        };
        let message: ServiceMessage = serde_json::from_str(raw)
            .map_err(|e| Error::protocol(format!("malformed service message: {e}")))?;

        match message.request_id {
            Some(raw_id) => match raw_id.parse::<RequestId>() {
                Ok(request_id) => Ok(Self::Response(Response {
                    request_id,
                    event: message.event,
                    payload: message.payload,
                })),
                Err(_) => Ok(Self::Stray { request_id: raw_id }),
            },
            None => Ok(Self::Notification(Notification {
                event: message.event.unwrap_or_default(),
                payload: Value::Object(message.payload),
            })),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn service_message(inner: Value) -> String {
        json!({ "event": "d2d_service_message", "data": inner.to_string() }).to_string()
    }

    #[test]
    fn test_channel_connect_with_token() {
        let text = json!({ "event": "ms.channel.connect", "data": { "token": "12345", "clients": [] } });
        assert_eq!(
            Inbound::parse(&text.to_string()).expect("parse"),
            Inbound::ChannelConnect {
                token: Some("12345".into())
            }
        );
    }

    #[test]
    fn test_channel_connect_without_token() {
        let text = json!({ "event": "ms.channel.connect", "data": { "clients": [] } });
        assert_eq!(
            Inbound::parse(&text.to_string()).expect("parse"),
            Inbound::ChannelConnect { token: None }
        );
    }

    #[test]
    fn test_channel_ready() {
        let text = json!({ "event": "ms.channel.ready", "data": {} });
        assert_eq!(Inbound::parse(&text.to_string()).expect("parse"), Inbound::ChannelReady);
    }

    #[test]
    fn test_correlated_response() {
        let id = RequestId::generate();
        let text = service_message(json!({
            "request_id": id.to_string(),
            "event": "api_version",
            "version": "4.3.4.0"
        }));

        let Inbound::Response(response) = Inbound::parse(&text).expect("parse") else {
            panic!("expected response");
        };
        assert_eq!(response.request_id, id);
        assert_eq!(response.event.as_deref(), Some("api_version"));
        assert_eq!(response.get_str("version"), Some("4.3.4.0"));
        assert!(!response.payload.contains_key("request_id"));
    }

    #[test]
    fn test_uncorrelated_service_message_is_notification() {
        let text = service_message(json!({ "event": "art_mode_changed", "status": "on" }));
        let Inbound::Notification(notification) = Inbound::parse(&text).expect("parse") else {
            panic!("expected notification");
        };
        assert_eq!(notification.event, "art_mode_changed");
        assert_eq!(notification.get_str("status"), Some("on"));
    }

    #[test]
    fn test_unknown_outer_event_is_notification() {
        let text = json!({ "event": "ms.remote.touchEnable", "data": { "x": 1 } });
        let Inbound::Notification(notification) =
            Inbound::parse(&text.to_string()).expect("parse")
        else {
            panic!("expected notification");
        };
        assert_eq!(notification.event, "ms.remote.touchEnable");
    }

    #[test]
    fn test_non_uuid_request_id_is_a_response() {
        let text = service_message(json!({ "request_id": "abc", "event": "x" }));
        let Inbound::Response(response) = Inbound::parse(&text).expect("parse") else {
            panic!("expected response");
        };
        assert_eq!(response.request_id.as_str(), "abc");
    }

    #[test]
    fn test_blank_request_id_is_stray() {
        let text = service_message(json!({ "request_id": "", "event": "x" }));
        assert_eq!(
            Inbound::parse(&text).expect("parse"),
            Inbound::Stray {
                request_id: String::new()
            }
        );
    }

    #[test]
    fn test_malformed_frames() {
        assert!(matches!(Inbound::parse("not json"), Err(Error::Protocol { .. })));

        let object_data = json!({ "event": "d2d_service_message", "data": { "request_id": "x" } });
        assert!(matches!(
            Inbound::parse(&object_data.to_string()),
            Err(Error::Protocol { .. })
        ));
    }
}
