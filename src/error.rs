//! Error types for session, authentication, and transfer operations.
//!
//! Every variant carries enough context (host, url, path) to produce a
//! human-readable reason on its own; callers report `to_string()` as the
//! failure reason.

use std::path::PathBuf;

use thiserror::Error;

use crate::session::JarError;
use crate::store::StoreError;

/// Errors surfaced by [`Session`](crate::Session) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// One of host, username, or password is empty. Detected locally.
    #[error("credentials are incomplete: {field} must not be empty")]
    InvalidCredentialsFormat {
        /// Name of the first empty field.
        field: &'static str,
    },

    /// The entry page could not be reached within the probe window.
    #[error("host {host} is unreachable: {reason}")]
    HostUnreachable {
        /// Host that was probed.
        host: String,
        /// Timeout or connection failure description.
        reason: String,
    },

    /// The host answered, but its entry page is not a BOCA login page.
    #[error("host {host} is not a BOCA server (page title: {title:?})")]
    NotTargetServer {
        /// Host that was probed.
        host: String,
        /// Title found on the entry page, if any.
        title: Option<String>,
    },

    /// A freshly created (or just refreshed) session failed to authenticate.
    #[error("authentication with {host} failed")]
    AuthenticationFailed {
        /// Host the login was attempted against.
        host: String,
    },

    /// No credentials are stored, so there is no session to transfer with.
    #[error("not logged in: no credentials stored")]
    NotLoggedIn,

    /// The server answered with a response shape outside the assumed contract.
    #[error("unexpected response from {url}: {reason}")]
    UnexpectedResponse {
        /// URL that produced the response.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Transport-level failure (DNS, connection refused, reset).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// URL being requested.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A URL could not be built or parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
    },

    /// Local filesystem failure while writing or reading transfer data.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The secret store rejected a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A persisted cookie jar or credential record could not be decoded.
    #[error(transparent)]
    Jar(#[from] JarError),
}

impl SessionError {
    /// Creates an authentication failure for `host`.
    pub fn authentication_failed(host: impl Into<String>) -> Self {
        Self::AuthenticationFailed { host: host.into() }
    }

    /// Creates an unexpected-response error.
    pub fn unexpected(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

// No `From<reqwest::Error>` or `From<std::io::Error>`: both need a url or path
// for the message, so the helper constructors above are used instead.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_format_names_the_field() {
        let error = SessionError::InvalidCredentialsFormat { field: "password" };
        assert!(error.to_string().contains("password"));
    }

    #[test]
    fn test_authentication_failed_mentions_host() {
        let error = SessionError::authentication_failed("10.0.0.5");
        let msg = error.to_string();
        assert!(msg.contains("10.0.0.5"), "Expected host in: {msg}");
        assert!(msg.contains("authentication"), "Expected reason in: {msg}");
    }

    #[test]
    fn test_not_target_server_includes_title() {
        let error = SessionError::NotTargetServer {
            host: "example.org".to_string(),
            title: Some("Welcome to nginx!".to_string()),
        };
        assert!(error.to_string().contains("Welcome to nginx!"));
    }

    #[test]
    fn test_unexpected_response_display() {
        let error = SessionError::unexpected(
            "http://10.0.0.5/boca/team/problem.php",
            "HTML without session marker",
        );
        let msg = error.to_string();
        assert!(msg.contains("team/problem.php"));
        assert!(msg.contains("HTML without session marker"));
    }
}
