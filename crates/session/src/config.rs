//! Session configuration
//!
//! Everything needed to reach the service: where the frame server listens,
//! where the HTTP API lives, and the realm and credentials to use.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default address of a locally running server
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:41071";

/// Default identity announced at registration
pub const DEFAULT_CLIENT_NAME: &str = "cradle.rust.lib";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// WebSocket URL of the frame server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Base URL of the HTTP API used for the realm context lookup
    #[serde(default)]
    pub api_url: String,

    /// Bearer token for the HTTP API, also forwarded at registration
    #[serde(default)]
    pub api_token: String,

    /// Realm whose context scopes every command
    #[serde(default)]
    pub realm_name: String,

    /// Identity announced to the server at registration
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_url: String::new(),
            api_token: String::new(),
            realm_name: String::new(),
            client_name: default_client_name(),
        }
    }
}

impl SessionConfig {
    /// Check that every field needed to connect is set
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("server_url", &self.server_url),
            ("api_url", &self.api_url),
            ("api_token", &self.api_token),
            ("realm_name", &self.realm_name),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!("missing {}", missing.join(", "))))
        }
    }
}
