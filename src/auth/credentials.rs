//! Server credentials and their persistence.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::SessionError;
use crate::store::{CREDENTIALS_KEY, SecretStore};

/// Path prefix every BOCA page lives under.
const BOCA_ROOT: &str = "boca";

/// The (host, username, password) triple for one BOCA team account.
///
/// The password is redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Server host, optionally with `:port` (e.g. `10.0.0.5`).
    pub host: String,
    /// Team login name.
    pub username: String,
    password: String,
}

impl Credentials {
    /// Creates a credential triple. No validation happens here.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the plaintext password. Never log it.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Rejects triples with an empty field, without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidCredentialsFormat`] naming the first
    /// empty field.
    pub fn check_format(&self) -> Result<(), SessionError> {
        let field = if self.host.trim().is_empty() {
            "host"
        } else if self.username.is_empty() {
            "username"
        } else if self.password.is_empty() {
            "password"
        } else {
            return Ok(());
        };
        Err(SessionError::InvalidCredentialsFormat { field })
    }

    /// Absolute URL of `path` relative to `http://{host}/boca/`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] when host or path do not form a URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
        let raw = format!("http://{}/{BOCA_ROOT}/{path}", self.host.trim());
        Url::parse(&raw).map_err(|_| SessionError::invalid_url(raw))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Reads and writes [`Credentials`] in a [`SecretStore`].
///
/// Only complete triples are ever returned: a stored record with an empty
/// field, or one that fails to decode, reads as absent.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn SecretStore>,
}

impl CredentialStore {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Returns the stored credentials, if a complete record exists.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] when the store cannot be read.
    pub fn get(&self) -> Result<Option<Credentials>, SessionError> {
        let Some(raw) = self.store.get(CREDENTIALS_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Credentials>(&raw) {
            Ok(credentials) if credentials.check_format().is_ok() => Ok(Some(credentials)),
            Ok(_) => {
                warn!("stored credentials are incomplete; ignoring them");
                Ok(None)
            }
            Err(error) => {
                warn!(error = %error, "stored credentials are unreadable; ignoring them");
                Ok(None)
            }
        }
    }

    /// Persists `credentials`, or clears them when `None`. Unconditional.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] when the store cannot be written.
    pub fn set(&self, credentials: Option<&Credentials>) -> Result<(), SessionError> {
        match credentials {
            Some(credentials) => {
                let raw = serde_json::to_string(credentials)
                    .map_err(|error| SessionError::Store(error.into()))?;
                self.store.update(CREDENTIALS_KEY, Some(&raw))?;
                debug!(host = %credentials.host, username = %credentials.username, "credentials stored");
            }
            None => {
                self.store.update(CREDENTIALS_KEY, None)?;
                debug!("credentials cleared");
            }
        }
        Ok(())
    }
}
