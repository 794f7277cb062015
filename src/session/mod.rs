//! Session manager: cookie jar lifecycle, expiry detection, and re-login.
//!
//! A [`Session`] is the single owner of one credential set's cookie jar.
//! Every public operation holds the session's operation lock for its whole
//! duration, so two re-authentications can never race and overwrite each
//! other's jar.
//!
//! # Fetch decision table
//!
//! 1. No credentials: empty document, no network call.
//! 2. Credentials, no stored jar: obtain a challenge from the entry page,
//!    log in, persist the jar, fetch. A failed login here is fatal.
//! 3. Credentials and stored jar: fetch with it. An expired response triggers
//!    one re-login reusing the stored challenge cookie; if that is rejected
//!    the session falls back to step 2.
//!
//! At most two authentication attempts happen per call (stored jar, then
//! fresh jar) and every fetch is retried at most once after a login. A
//! download shares one such budget between its initial login and its retry.

mod document;
pub mod jar;

use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use document::{
    Document, LOGIN_SUCCESS_MARKER, SESSION_EXPIRED_MARKER, is_boca_login_title,
    is_login_successful, is_session_active,
};
pub use jar::{JarError, SessionJar, StoredCookie};

use crate::auth::{
    CHALLENGE_COOKIE, CredentialStore, Credentials, ENTRY_PATH, authenticate, probe_entry_page,
};
use crate::error::SessionError;
use crate::store::{COOKIE_JAR_KEY, SecretStore};
use crate::user_agent;

/// A page that requires a team login; fetched to force a (re-)login.
pub const PROTECTED_PATH: &str = "team/index.php";

/// Logins per public call: one answering the stored jar's challenge, one with a fresh jar.
pub(crate) const MAX_AUTH_ATTEMPTS: u32 = 2;

/// Session state derived from stored credentials, jar, and the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credentials are stored.
    NoCredentials,
    /// Credentials are stored but no cookie jar is.
    NoJar,
    /// The stored jar is logged in.
    JarValid,
    /// The stored jar's server session has lapsed.
    JarExpired,
}

impl SessionState {
    /// Returns the stable label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCredentials => "no credentials",
            Self::NoJar => "logged out",
            Self::JarValid => "logged in",
            Self::JarExpired => "session expired",
        }
    }
}

/// Turns a fetched page into a typed record.
///
/// Implementations live with the caller; the session only supplies the
/// document and never interprets domain content.
pub trait PageExtractor {
    /// Record produced from the page.
    type Output;

    /// Path of the page, relative to `http://{host}/boca/`.
    fn path(&self) -> &str;

    /// Builds the record from the fetched page.
    fn extract(&self, document: &Document) -> Self::Output;
}

/// `true` for paths that hit the BOCA entry page, which logs out an
/// authenticated visitor.
#[must_use]
pub fn is_logout_path(path: &str) -> bool {
    path.is_empty() || path == ENTRY_PATH
}

/// Authenticated session against one BOCA server.
pub struct Session {
    credentials: CredentialStore,
    store: Arc<dyn SecretStore>,
    jar: Arc<SessionJar>,
    client: Client,
    pub(crate) transfer_client: Client,
    pub(crate) op_lock: Mutex<()>,
}

impl Session {
    /// Creates a session persisted in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Client`] if the HTTP clients cannot be built.
    pub fn new(store: Arc<dyn SecretStore>) -> Result<Self, SessionError> {
        let jar = Arc::new(SessionJar::new());
        let client = build_client(Some(Arc::clone(&jar)))?;
        let transfer_client = build_client(None)?;
        Ok(Self {
            credentials: CredentialStore::new(Arc::clone(&store)),
            store,
            jar,
            client,
            transfer_client,
            op_lock: Mutex::new(()),
        })
    }

    /// The credential store backing this session.
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Fetches `path` (relative to `http://{host}/boca/`) with a valid session,
    /// logging in or re-logging in as needed.
    ///
    /// Fetching the entry page (`""` or `index.php`) logs out.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AuthenticationFailed`] when no valid session can
    /// be established, or a network/store error.
    pub async fn fetch_authenticated(&self, path: &str) -> Result<Document, SessionError> {
        let _guard = self.op_lock.lock().await;
        self.fetch_unlocked(path).await
    }

    /// Fetches the extractor's page and hands it over.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_authenticated`](Self::fetch_authenticated).
    pub async fn extract<E: PageExtractor>(&self, extractor: &E) -> Result<E::Output, SessionError> {
        let document = self.fetch_authenticated(extractor.path()).await?;
        Ok(extractor.extract(&document))
    }

    /// Validates `candidate` against its server and, on success, makes it the
    /// session's credentials with a fresh logged-in jar.
    ///
    /// On any failure nothing is left persisted: previous credentials and jar
    /// are cleared as well.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidCredentialsFormat`] for an empty field (no network)
    /// - [`SessionError::HostUnreachable`] / [`SessionError::NotTargetServer`] from the probe
    /// - [`SessionError::AuthenticationFailed`] when the login is rejected
    #[instrument(skip(self, candidate), fields(host = %candidate.host, username = %candidate.username))]
    pub async fn login(&self, candidate: &Credentials) -> Result<(), SessionError> {
        let _guard = self.op_lock.lock().await;
        candidate.check_format()?;
        probe_entry_page(&self.transfer_client, candidate).await?;

        // A jar from another account or host is useless for the candidate.
        self.clear_jar()?;
        self.credentials.set(Some(candidate))?;

        // Any failure here counts as a rejected login, including transient
        // network errors after the probe.
        match self.fetch_unlocked(PROTECTED_PATH).await {
            Ok(_) => {
                info!("credentials are valid");
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "could not log in with given credentials");
                self.credentials.set(None)?;
                self.clear_jar()?;
                Err(SessionError::authentication_failed(&candidate.host))
            }
        }
    }

    /// Boolean form of [`login`](Self::login).
    pub async fn validate(&self, candidate: &Credentials) -> bool {
        self.login(candidate).await.is_ok()
    }

    /// Logs out on the server (when a live session exists) and forgets the
    /// stored credentials and jar.
    ///
    /// # Errors
    ///
    /// Returns a network or store error; credentials are cleared regardless.
    pub async fn logout(&self) -> Result<Document, SessionError> {
        let _guard = self.op_lock.lock().await;
        let outcome = self.fetch_unlocked(ENTRY_PATH).await;
        self.credentials.set(None)?;
        self.clear_jar()?;
        info!("credentials cleared");
        outcome
    }

    /// Reports the session state. With a stored jar this costs one fetch of a
    /// protected page; it never logs in.
    ///
    /// # Errors
    ///
    /// Returns a network or store error.
    pub async fn state(&self) -> Result<SessionState, SessionError> {
        let _guard = self.op_lock.lock().await;
        let Some(credentials) = self.credentials.get()? else {
            return Ok(SessionState::NoCredentials);
        };
        if !self.load_stored_jar()? {
            return Ok(SessionState::NoJar);
        }
        let document = self.get_document(credentials.endpoint(PROTECTED_PATH)?).await?;
        Ok(if document.is_session_active() {
            SessionState::JarValid
        } else {
            SessionState::JarExpired
        })
    }

    /// `Cookie` header value carrying the current session, for requests made
    /// outside the managed jar. Logs in first when no jar is stored.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without credentials, or
    /// [`SessionError::AuthenticationFailed`] when no session can be created.
    pub async fn cookie_header(&self) -> Result<String, SessionError> {
        let _guard = self.op_lock.lock().await;
        self.cookie_header_unlocked().await
    }

    async fn fetch_unlocked(&self, path: &str) -> Result<Document, SessionError> {
        let mut attempts_left = MAX_AUTH_ATTEMPTS;
        self.fetch_with_budget(path, &mut attempts_left).await
    }

    /// Fetch decision table; each login spends one of `attempts_left`.
    #[instrument(skip(self, attempts_left))]
    pub(crate) async fn fetch_with_budget(
        &self,
        path: &str,
        attempts_left: &mut u32,
    ) -> Result<Document, SessionError> {
        let Some(credentials) = self.credentials.get()? else {
            debug!("no credentials stored");
            self.clear_jar()?;
            return Ok(Document::empty());
        };
        let url = credentials.endpoint(path)?;
        let logout = is_logout_path(path);
        let mut reuse_stored = self.load_stored_jar()?;

        if reuse_stored {
            let document = self.get_document(url.clone()).await?;

            if document.is_session_active() {
                if logout {
                    self.clear_jar()?;
                    info!("logged out");
                }
                return Ok(document);
            }

            if logout {
                debug!("stored session already expired, no need to log out");
                self.clear_jar()?;
                return Ok(document);
            }
        } else if logout {
            debug!("not logged in and no stored cookie jar, logout not needed");
            return Ok(Document::empty());
        }

        while *attempts_left > 0 {
            *attempts_left -= 1;
            if reuse_stored {
                reuse_stored = false;
                if !self.reauthenticate_stored(&credentials).await? {
                    // Typically the stored jar lost its challenge cookie.
                    warn!(host = %credentials.host, "stored cookie jar could not log in; creating a new one");
                    continue;
                }
            } else {
                self.create_jar(&credentials).await?;
            }

            let document = self.get_document(url.clone()).await?;
            return expect_active(document, &credentials);
        }

        warn!(host = %credentials.host, "no login attempts left");
        Err(SessionError::authentication_failed(&credentials.host))
    }

    async fn cookie_header_unlocked(&self) -> Result<String, SessionError> {
        let Some(credentials) = self.credentials.get()? else {
            return Err(SessionError::NotLoggedIn);
        };
        let mut attempts_left = MAX_AUTH_ATTEMPTS;
        self.ensure_jar(&credentials, &mut attempts_left).await?;
        self.jar
            .header_for(&credentials.endpoint("")?)
            .ok_or_else(|| SessionError::authentication_failed(&credentials.host))
    }

    /// Loads the stored jar, logging in first when none is stored.
    pub(crate) async fn ensure_jar(
        &self,
        credentials: &Credentials,
        attempts_left: &mut u32,
    ) -> Result<(), SessionError> {
        if self.load_stored_jar()? {
            return Ok(());
        }
        self.fetch_with_budget(PROTECTED_PATH, attempts_left).await?;
        if self.load_stored_jar()? {
            Ok(())
        } else {
            Err(SessionError::authentication_failed(&credentials.host))
        }
    }

    /// `Cookie` header value for a request to `url` made outside the managed
    /// jar. `None` when no stored cookie applies, such as a foreign host.
    pub(crate) fn header_for(&self, url: &Url) -> Option<String> {
        self.jar.header_for(url)
    }

    /// Re-login answering the challenge cookie already in the stored jar.
    async fn reauthenticate_stored(&self, credentials: &Credentials) -> Result<bool, SessionError> {
        let Some(challenge) = self.jar.value_of(CHALLENGE_COOKIE) else {
            return Ok(false);
        };
        if !authenticate(&self.client, credentials, &challenge).await? {
            return Ok(false);
        }
        self.persist_jar()?;
        info!(host = %credentials.host, "stale session recovered with stored cookie jar");
        Ok(true)
    }

    /// Builds a new jar: fresh challenge from the entry page, then login.
    async fn create_jar(&self, credentials: &Credentials) -> Result<(), SessionError> {
        self.jar.clear();
        // The jar is empty, so visiting the entry page cannot log anyone out.
        self.get_document(credentials.endpoint(ENTRY_PATH)?).await?;

        let Some(challenge) = self.jar.value_of(CHALLENGE_COOKIE) else {
            warn!(host = %credentials.host, "entry page did not issue a challenge cookie");
            return Err(SessionError::authentication_failed(&credentials.host));
        };

        if !authenticate(&self.client, credentials, &challenge).await? {
            self.jar.clear();
            return Err(SessionError::authentication_failed(&credentials.host));
        }

        self.persist_jar()?;
        info!(host = %credentials.host, "logged in with new cookie jar");
        Ok(())
    }

    async fn get_document(&self, url: Url) -> Result<Document, SessionError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SessionError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::unexpected(url.as_str(), format!("HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| SessionError::network(url.as_str(), e))?;
        debug!(url = %url, bytes = html.len(), "document fetched");
        Ok(Document::new(url, html))
    }

    /// Loads the persisted jar into the working jar. `false` when none is
    /// stored; an unreadable blob is discarded.
    fn load_stored_jar(&self) -> Result<bool, SessionError> {
        let Some(blob) = self.store.get(COOKIE_JAR_KEY)? else {
            self.jar.clear();
            return Ok(false);
        };
        match jar::deserialize(&blob) {
            Ok(stored) => {
                self.jar.replace(stored);
                Ok(true)
            }
            Err(error) => {
                warn!(error = %error, "discarding unreadable stored cookie jar");
                self.clear_jar()?;
                Ok(false)
            }
        }
    }

    fn persist_jar(&self) -> Result<(), SessionError> {
        let blob = jar::serialize(&self.jar)?;
        self.store.update(COOKIE_JAR_KEY, Some(&blob))?;
        Ok(())
    }

    fn clear_jar(&self) -> Result<(), SessionError> {
        self.jar.clear();
        self.store.update(COOKIE_JAR_KEY, None)?;
        Ok(())
    }
}

/// A page still showing the expiry alert right after a successful login is
/// a second failure of the same kind.
fn expect_active(document: Document, credentials: &Credentials) -> Result<Document, SessionError> {
    if document.is_session_active() {
        Ok(document)
    } else {
        warn!(host = %credentials.host, "session still expired after login");
        Err(SessionError::authentication_failed(&credentials.host))
    }
}

fn build_client(jar: Option<Arc<SessionJar>>) -> Result<Client, SessionError> {
    let mut builder = Client::builder()
        .gzip(true)
        .user_agent(user_agent::default_user_agent());
    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }
    builder.build().map_err(SessionError::Client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_logout_paths() {
        assert!(is_logout_path(""));
        assert!(is_logout_path("index.php"));
        assert!(!is_logout_path("team/index.php"));
        assert!(!is_logout_path("index.php?x=1"));
    }

    #[test]
    fn test_state_labels_are_distinct() {
        let labels = [
            SessionState::NoCredentials.as_str(),
            SessionState::NoJar.as_str(),
            SessionState::JarValid.as_str(),
            SessionState::JarExpired.as_str(),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[tokio::test]
    async fn test_no_credentials_returns_empty_document_and_clears_stray_jar() {
        let store = Arc::new(MemoryStore::new());
        store.update(COOKIE_JAR_KEY, Some("stray")).unwrap();
        let session = Session::new(store.clone()).unwrap();

        let document = session.fetch_authenticated(PROTECTED_PATH).await.unwrap();

        assert!(document.is_empty());
        assert!(store.get(COOKIE_JAR_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_stored_jar_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        store.update(COOKIE_JAR_KEY, Some("{broken")).unwrap();
        let session = Session::new(store.clone()).unwrap();

        assert!(!session.load_stored_jar().unwrap());
        assert!(store.get(COOKIE_JAR_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_format_fails_before_network() {
        let session = Session::new(Arc::new(MemoryStore::new())).unwrap();
        // An unroutable host would hang or error if the probe ran.
        let candidate = Credentials::new("203.0.113.1", "team1", "");
        let result = session.login(&candidate).await;
        assert!(matches!(
            result,
            Err(SessionError::InvalidCredentialsFormat { field: "password" })
        ));
        assert!(session.credentials().get().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cookie_header_without_credentials_is_not_logged_in() {
        let session = Session::new(Arc::new(MemoryStore::new())).unwrap();
        assert!(matches!(
            session.cookie_header().await,
            Err(SessionError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn test_state_without_credentials_or_jar() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone()).unwrap();
        assert_eq!(session.state().await.unwrap(), SessionState::NoCredentials);

        session
            .credentials()
            .set(Some(&Credentials::new("10.0.0.5", "team1", "secret")))
            .unwrap();
        assert_eq!(session.state().await.unwrap(), SessionState::NoJar);
    }
}
