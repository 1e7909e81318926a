//! Client session for the cradle computation service
//!
//! A [`Session`] retrieves the realm context over HTTP, opens the frame
//! connection, registers, and then exposes one method per command kind.
//!
//! ```no_run
//! # async fn demo() -> session::Result<()> {
//! use session::{Session, SessionConfig};
//!
//! let config = SessionConfig {
//!     api_url: "https://mgh.thinknode.io/api/v1.0".into(),
//!     api_token: "token".into(),
//!     realm_name: "dosimetry".into(),
//!     ..Default::default()
//! };
//! let mut session = Session::connect(config).await?;
//! session.introspection_set_enabled(true).await?;
//! let snapshot = session.query_introspection_status(false).await?;
//! println!("{}", snapshot.render(true));
//! # Ok(())
//! # }
//! ```

mod bootstrap;
mod command;
mod config;
mod error;
mod session;

pub use bootstrap::{context_url, retrieve_realm_context};
pub use command::{
    decode_content, request_content, CommandKind, EchoReply, Reply, ServiceCommand,
};
pub use config::{SessionConfig, DEFAULT_CLIENT_NAME, DEFAULT_SERVER_URL};
pub use error::{Error, Result};
pub use session::{Session, SharedSession};
