//! Error types for the frame protocol
//!
//! Every variant is terminal for the exchange that raised it. Nothing in this
//! crate retries; that policy belongs to the caller.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::protocol::{Request, Response, ServerError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("Connection closed by server")]
    ConnectionClosed,

    #[error("Unexpected {0} frame on a binary channel")]
    UnexpectedFrame(&'static str),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode frame: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error(
        "Mismatched request IDs: sent {}, received {}",
        request.request_id,
        response.request_id
    )]
    RequestIdMismatch {
        request: Box<Request>,
        response: Box<Response>,
    },

    #[error("Received error response for request {}: {error}", response.request_id)]
    ErrorResponse {
        /// The request being completed, when the caller supplied it
        request: Option<Box<Request>>,
        response: Box<Response>,
        error: ServerError,
    },

    #[error("Malformed {command} response: {reason}")]
    MalformedResponse { command: String, reason: String },

    #[error("Dispatcher is no longer running")]
    DispatcherClosed,
}

impl Error {
    /// Create a malformed response error for the named command
    pub fn malformed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// The request attached to a correlation error, if any
    pub fn request(&self) -> Option<&Request> {
        match self {
            Self::RequestIdMismatch { request, .. } => Some(request),
            Self::ErrorResponse { request, .. } => request.as_deref(),
            _ => None,
        }
    }

    /// The response attached to a correlation error, if any
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::RequestIdMismatch { response, .. } | Self::ErrorResponse { response, .. } => {
                Some(response)
            }
            _ => None,
        }
    }

    /// Whether the failure came from the socket rather than the protocol
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ConnectionClosed | Self::UnexpectedFrame(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
