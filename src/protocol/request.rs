//! Request and Response message types.
//!
//! Requests are wrapped twice: the request body is serialized to a JSON
//! string and carried as `params.data` of a `ms.channel.emit` envelope.
//! Responses come back the same way inside `d2d_service_message` frames.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::ArtCommand;

// ============================================================================
// Constants
// ============================================================================

/// Outer method for channel messages.
pub const CHANNEL_EMIT_METHOD: &str = "ms.channel.emit";

/// Event name for requests addressed to the art application.
pub const APP_REQUEST_EVENT: &str = "art_app_request";

/// Error code the device reports for unknown content.
const ITEM_NOT_FOUND_CODE: &str = "-10";

// ============================================================================
// Request
// ============================================================================

/// A correlated request from the client to the device.
///
/// # Format
///
/// ```json
/// {
///   "method": "ms.channel.emit",
///   "params": {
///     "event": "art_app_request",
///     "to": "host",
///     "data": "{\"request_id\":\"uuid\",\"request\":\"api_version\"}"
///   }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Action name (the `request` field).
    pub action: String,

    /// Additional flattened parameters.
    pub params: Map<String, Value>,
}

#[derive(Serialize)]
struct ChannelEmit<'a> {
    method: &'static str,
    params: EmitParams<'a>,
}

#[derive(Serialize)]
struct EmitParams<'a> {
    event: &'static str,
    to: &'static str,
    data: &'a str,
}

impl Request {
    /// Creates a new request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(action: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            id: RequestId::generate(),
            action: action.into(),
            params,
        }
    }

    /// Creates a request from a typed art command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the command does not serialize to an
    /// object with a `request` field.
    pub fn from_command(command: &ArtCommand) -> Result<Self> {
        let Value::Object(mut params) = serde_json::to_value(command)? else {
            return Err(Error::protocol("command did not serialize to an object"));
        };
        let action = match params.remove("request") {
            Some(Value::String(action)) => action,
            _ => return Err(Error::protocol("command is missing its action name")),
        };
        Ok(Self::new(action, params))
    }

    /// Replaces the correlation ID.
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    /// Builds the inner body: `{request_id, request, ...params}`.
    #[must_use]
    pub fn body(&self) -> Map<String, Value> {
        let mut body = self.params.clone();
        body.insert("request_id".into(), Value::String(self.id.to_string()));
        body.insert("request".into(), Value::String(self.action.clone()));
        body
    }

    /// Serializes the request into its wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_frame(&self) -> Result<String> {
        let data = serde_json::to_string(&Value::Object(self.body()))?;
        let envelope = ChannelEmit {
            method: CHANNEL_EMIT_METHOD,
            params: EmitParams {
                event: APP_REQUEST_EVENT,
                to: "host",
                data: &data,
            },
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

// ============================================================================
// Response
// ============================================================================

/// A correlated response from the device.
///
/// `request_id` and `event` are split off the decoded service message; the
/// remaining fields form the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Matches the request `id`.
    pub request_id: RequestId,

    /// Embedded event name (`error` on failure).
    pub event: Option<String>,

    /// Remaining response fields.
    pub payload: Map<String, Value>,
}

impl Response {
    /// Returns `true` if the device reported an error.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.event.as_deref() == Some("error")
    }

    /// Converts an error payload into [`Error::RemoteRejected`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteRejected`] if the device reported an error.
    pub fn into_result(self) -> Result<Self> {
        if !self.is_error() {
            return Ok(self);
        }
        let code = match self.payload.get("error_code") {
            Some(Value::String(code)) => code.clone(),
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        };
        let message = match code.as_str() {
            ITEM_NOT_FOUND_CODE => "item does not exist".to_string(),
            _ => self
                .get_str("error_message")
                .unwrap_or("request failed")
                .to_string(),
        };
        Err(Error::remote_rejected(code, message))
    }

    /// Gets a string field.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Gets a required string field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the field is missing or not a string.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)
            .ok_or_else(|| Error::protocol(format!("response is missing `{key}`")))
    }

    /// Decodes a field that is itself a JSON-encoded string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the field is missing or does not
    /// decode into `T`.
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let raw = self.require_str(key)?;
        serde_json::from_str(raw)
            .map_err(|e| Error::protocol(format!("`{key}` is not valid encoded JSON: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
