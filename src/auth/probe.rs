//! Lightweight reachability and identity check for a candidate host.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use super::challenge::ENTRY_PATH;
use crate::auth::Credentials;
use crate::error::SessionError;
use crate::session::{Document, is_boca_login_title};

/// Upper bound on the probe request. Only the probe has a timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches the entry page of `credentials.host` and checks that it is a
/// BOCA login page.
///
/// `client` should not carry the session jar: the probe must leave no
/// cookies behind.
///
/// # Errors
///
/// - [`SessionError::HostUnreachable`] on timeout or connection failure
/// - [`SessionError::NotTargetServer`] when the title does not match
#[instrument(skip(client, credentials), fields(host = %credentials.host))]
pub async fn probe_entry_page(client: &Client, credentials: &Credentials) -> Result<(), SessionError> {
    let url = credentials.endpoint(ENTRY_PATH)?;
    let unreachable = |error: reqwest::Error| SessionError::HostUnreachable {
        host: credentials.host.clone(),
        reason: if error.is_timeout() {
            format!("no answer within {}s", PROBE_TIMEOUT.as_secs())
        } else {
            error.without_url().to_string()
        },
    };

    let response = client
        .get(url.clone())
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
        .map_err(unreachable)?;
    let body = response.text().await.map_err(unreachable)?;

    let title = Document::new(url, body).title();
    debug!(title = ?title, "entry page fetched");
    match title {
        Some(title) if is_boca_login_title(&title) => Ok(()),
        title => Err(SessionError::NotTargetServer {
            host: credentials.host.clone(),
            title,
        }),
    }
}
