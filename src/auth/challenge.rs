//! Challenge-response login against the BOCA entry page.
//!
//! BOCA never receives the plaintext password. The entry page issues a
//! `PHPSESSID` cookie; its value is the challenge, and the login request
//! carries `sha256(sha256(password) + challenge)` as hex.

use reqwest::Client;
use tracing::{debug, instrument};

use crate::auth::Credentials;
use crate::digest::sha256_hex;
use crate::error::SessionError;
use crate::session::is_login_successful;

/// Cookie whose value is the login challenge.
pub const CHALLENGE_COOKIE: &str = "PHPSESSID";

/// Entry page; also the login target and, when visited while logged in, logout.
pub const ENTRY_PATH: &str = "index.php";

/// Computes the password hash BOCA expects for `challenge`.
#[must_use]
pub fn login_hash(password: &str, challenge: &str) -> String {
    let mut inner = sha256_hex(password);
    inner.push_str(challenge);
    sha256_hex(&inner)
}

/// Submits `credentials` answering `challenge` and reports whether BOCA
/// accepted them.
///
/// `client` must carry the session jar holding the challenge cookie, so the
/// server can match the hash to its session. A rejected login is `Ok(false)`:
/// bad password, stale challenge, and server errors look identical.
///
/// # Errors
///
/// Returns [`SessionError::Network`] on transport failure.
#[instrument(skip(client, credentials, challenge), fields(host = %credentials.host, username = %credentials.username))]
pub async fn authenticate(
    client: &Client,
    credentials: &Credentials,
    challenge: &str,
) -> Result<bool, SessionError> {
    let mut url = credentials.endpoint(ENTRY_PATH)?;
    url.query_pairs_mut()
        .append_pair("name", &credentials.username)
        .append_pair("password", &login_hash(credentials.password(), challenge));

    // Keep the hash out of error messages.
    let redacted = credentials.endpoint(ENTRY_PATH)?.to_string();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SessionError::network(redacted.clone(), e.without_url()))?;
    let body = response
        .text()
        .await
        .map_err(|e| SessionError::network(redacted, e.without_url()))?;

    let accepted = is_login_successful(&body);
    debug!(accepted, "login response received");
    Ok(accepted)
}
