//! Realm context lookup
//!
//! Happens once, over plain HTTP, before the frame connection is used.

use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct RealmContext {
    id: String,
}

/// URL of the realm context endpoint
pub fn context_url(api_url: &str, realm_name: &str) -> String {
    format!(
        "{}/iam/realms/{}/context",
        api_url.trim_end_matches('/'),
        realm_name
    )
}

/// Fetch the context ID for the configured realm
///
/// Any non-2xx status is an error.
pub async fn retrieve_realm_context(
    http: &reqwest::Client,
    config: &SessionConfig,
) -> Result<String> {
    let url = context_url(&config.api_url, &config.realm_name);
    debug!(%url, "Retrieving realm context");

    let context: RealmContext = http
        .get(&url)
        .bearer_auth(&config.api_token)
        .header(ACCEPT, "application/json")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    debug!(context_id = %context.id, "Retrieved realm context");
    Ok(context.id)
}
