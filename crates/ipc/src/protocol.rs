//! Wire envelopes for the frame protocol
//!
//! Each frame is one MessagePack map. Requests are `{request_id, content}`
//! where `content` is a single-entry map naming the command, e.g.
//! `{"iss_object": {...}}`. Responses echo the `request_id` and carry either a
//! named response payload or `{"error": ...}`.

use std::fmt;

use rmpv::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Union tag the server uses for error responses
pub const ERROR_TAG: &str = "error";

/// Generate a fresh request identifier (128 random bits, hex)
pub fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A request frame sent to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Unique request identifier
    pub request_id: String,
    /// Named command payload
    pub content: Value,
}

impl Request {
    pub fn new(request_id: impl Into<String>, content: Value) -> Self {
        Self {
            request_id: request_id.into(),
            content,
        }
    }

    /// The command name carried by this request
    pub fn tag(&self) -> Option<&str> {
        union_tag(&self.content)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(frame)?)
    }
}

/// A response frame received from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response corresponds to
    pub request_id: String,
    /// Named response payload or error marker
    pub content: Value,
}

impl Response {
    pub fn new(request_id: impl Into<String>, content: Value) -> Self {
        Self {
            request_id: request_id.into(),
            content,
        }
    }

    /// Create a response with a named payload
    pub fn success(request_id: impl Into<String>, tag: &str, body: Value) -> Self {
        Self::new(request_id, named(tag, body))
    }

    /// Create an error response
    pub fn error(request_id: impl Into<String>, error: &ServerError) -> Self {
        Self::new(request_id, named(ERROR_TAG, error.to_value()))
    }

    /// The response name carried by this response
    pub fn tag(&self) -> Option<&str> {
        union_tag(&self.content)
    }

    /// Check if the server signaled an error
    pub fn is_error(&self) -> bool {
        self.tag() == Some(ERROR_TAG)
    }

    /// Decode the error payload, if this is an error response
    pub fn server_error(&self) -> Option<ServerError> {
        if !self.is_error() {
            return None;
        }
        union_body(&self.content).map(ServerError::from_body)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(frame)?)
    }
}

/// Error payload reported by the server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerError {
    /// An HTTP request made on the client's behalf returned a bad status
    BadStatusCode {
        attempted_request: Value,
        response: Value,
    },
    /// The client sent a command before registering
    UnregisteredClient,
    /// Free-form failure description
    Unknown(String),
    /// A variant this client does not know about
    Other { tag: String, body: Value },
}

impl ServerError {
    /// Interpret the body of an `error` union
    pub fn from_body(body: &Value) -> Self {
        let Some(tag) = union_tag(body) else {
            return Self::Other {
                tag: String::new(),
                body: body.clone(),
            };
        };
        let inner = union_body(body).cloned().unwrap_or(Value::Nil);
        match tag {
            "bad_status_code" => Self::BadStatusCode {
                attempted_request: field(&inner, "attempted_request")
                    .cloned()
                    .unwrap_or(Value::Nil),
                response: field(&inner, "response").cloned().unwrap_or(Value::Nil),
            },
            "unregistered_client" => Self::UnregisteredClient,
            "unknown" => Self::Unknown(inner.as_str().unwrap_or_default().to_string()),
            other => Self::Other {
                tag: other.to_string(),
                body: inner,
            },
        }
    }

    /// Encode as the body of an `error` union
    pub fn to_value(&self) -> Value {
        match self {
            Self::BadStatusCode {
                attempted_request,
                response,
            } => named(
                "bad_status_code",
                map([
                    ("attempted_request", attempted_request.clone()),
                    ("response", response.clone()),
                ]),
            ),
            Self::UnregisteredClient => named("unregistered_client", Value::Nil),
            Self::Unknown(message) => named("unknown", Value::from(message.as_str())),
            Self::Other { tag, body } => named(tag, body.clone()),
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadStatusCode { response, .. } => match field(response, "status_code") {
                Some(status) => write!(f, "upstream HTTP request failed with status {status}"),
                None => write!(f, "upstream HTTP request failed"),
            },
            Self::UnregisteredClient => write!(f, "client is not registered"),
            Self::Unknown(message) => write!(f, "{message}"),
            Self::Other { tag, body } => write!(f, "{tag}: {body}"),
        }
    }
}

// ========== Value helpers ==========

/// Build a single-entry union map `{tag: body}`
pub fn named(tag: &str, body: Value) -> Value {
    Value::Map(vec![(Value::from(tag), body)])
}

/// Build a map with string keys
pub fn map<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(key, value)| (Value::from(key), value))
            .collect(),
    )
}

/// The discriminator of a union: the only key of a one-entry map
pub fn union_tag(value: &Value) -> Option<&str> {
    match value {
        Value::Map(entries) if entries.len() == 1 => entries[0].0.as_str(),
        _ => None,
    }
}

/// The payload of a union
pub fn union_body(value: &Value) -> Option<&Value> {
    match value {
        Value::Map(entries) if entries.len() == 1 => Some(&entries[0].1),
        _ => None,
    }
}

/// Look up a string key in a map
pub fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .as_map()?
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

/// Remove and return a string key's value from a map
pub fn take_field(value: Value, key: &str) -> Option<Value> {
    match value {
        Value::Map(entries) => entries
            .into_iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique_hex() {
        let a = new_request_id();
        let b = new_request_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_request_frame_is_a_named_map() {
        let req = Request::new("abc", named("iss_object", map([("object_id", Value::from("x"))])));
        let frame = req.encode().unwrap();

        let raw: Value = rmp_serde::from_slice(&frame).unwrap();
        assert_eq!(field(&raw, "request_id").and_then(Value::as_str), Some("abc"));
        let content = field(&raw, "content").unwrap();
        assert_eq!(union_tag(content), Some("iss_object"));
        assert_eq!(Request::decode(&frame).unwrap(), req);
    }

    #[test]
    fn test_response_error_detection() {
        let ok = Response::success("1", "post_iss_object_response", Value::Nil);
        assert!(!ok.is_error());
        assert_eq!(ok.server_error(), None);

        let err = Response::error("1", &ServerError::Unknown("boom".into()));
        assert!(err.is_error());
        assert_eq!(err.server_error(), Some(ServerError::Unknown("boom".into())));
    }

    #[test]
    fn test_server_error_variants() {
        let bad = ServerError::BadStatusCode {
            attempted_request: map([("url", Value::from("https://x"))]),
            response: map([("status_code", Value::from(404))]),
        };
        assert_eq!(ServerError::from_body(&bad.to_value()), bad);
        assert!(bad.to_string().contains("404"));

        assert_eq!(
            ServerError::from_body(&named("unregistered_client", Value::Nil)),
            ServerError::UnregisteredClient
        );

        let other = ServerError::from_body(&named("novel", Value::from(1)));
        assert_eq!(
            other,
            ServerError::Other {
                tag: "novel".into(),
                body: Value::from(1)
            }
        );
    }

    #[test]
    fn test_union_helpers_reject_multi_entry_maps() {
        let two = map([("a", Value::Nil), ("b", Value::Nil)]);
        assert_eq!(union_tag(&two), None);
        assert_eq!(union_body(&two), None);
        assert!(field(&two, "b").is_some());
        assert_eq!(take_field(two, "c"), None);
    }
}
