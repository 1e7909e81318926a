//! Frame protocol and request/response correlation for the cradle service
//!
//! This crate has no knowledge of individual commands. It moves MessagePack
//! envelopes over a message-framed transport and pairs each response with the
//! command that asked for it.
//!
//! # Architecture
//!
//! ```text
//! Session (typed facade)           IPC Crate
//! ┌──────────────────────────┐    ┌──────────────────────────┐
//! │  ServiceCommand           │───>│  Command (trait)          │
//! │  (closed command enum)    │    │  CommandPerformer/Exchange│
//! └──────────────────────────┘    │  Connection  | Dispatcher │
//!                                  └────────────┬─────────────┘
//!                                               │ FrameTransport
//!                                               v
//!                                        WebSocket frames
//!                                               │
//!                                               v
//!                                        ┌──────────────┐
//!                                        │    Server    │
//!                                        └──────────────┘
//! ```
//!
//! Two correlation modes are offered:
//!
//! - [`Connection`]: responses are taken strictly in arrival order. Callers
//!   pipeline by issuing several `send`s before the matching `receive`s; the
//!   server must answer in request order.
//! - [`Dispatcher`]: a background task routes each response to its waiter by
//!   `request_id`, so order does not matter and many tasks may share it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ipc::{Connection, WebSocketTransport};
//!
//! let transport = WebSocketTransport::connect("ws://localhost:41071").await?;
//! let mut connection = Connection::new(transport);
//!
//! let exchange = connection.send(command).await?;
//! // ... other sends ...
//! let output = connection.receive(exchange).await?;
//! ```

mod connection;
mod dispatcher;
mod error;
mod performer;
pub mod protocol;
mod transport;

#[cfg(test)]
mod test_support;

pub use connection::Connection;
pub use dispatcher::{Dispatcher, Pending};
pub use error::{Error, Result};
pub use performer::{Command, CommandPerformer, Exchange};
pub use protocol::{Request, Response, ServerError};
pub use transport::{FrameTransport, MemoryTransport, WebSocketTransport};

// Re-exported so downstream crates agree on the value type
pub use rmpv::Value;
