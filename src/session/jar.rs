//! Session cookie jar and its persisted blob codec.
//!
//! [`SessionJar`] is handed to reqwest as the cookie provider for document
//! fetches, so `Set-Cookie` headers from the server (including across
//! redirects) land here. Storage and RFC 6265 matching are delegated to
//! `cookie_store`; unlike `reqwest::cookie::Jar` the jar can still look up a
//! cookie by name, which the login hash (challenge cookie) and persistence need.

use std::convert::Infallible;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use cookie_store::{CookieStore as RfcCookieStore, RawCookie};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

/// Current blob format version written by [`serialize`].
const BLOB_VERSION: u32 = 2;

/// A stored cookie with its resolved domain, path and expiry.
pub type StoredCookie = cookie_store::Cookie<'static>;

/// Errors decoding a persisted jar blob.
#[derive(Debug, thiserror::Error)]
pub enum JarError {
    /// The blob is not valid JSON for the expected shape.
    #[error("persisted cookie jar is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The blob was written by an incompatible version.
    #[error("persisted cookie jar has unsupported version {0}")]
    UnsupportedVersion(u32),
}

/// Cookie jar owned by a [`Session`](crate::Session).
#[derive(Default)]
pub struct SessionJar {
    store: RwLock<RfcCookieStore>,
}

impl SessionJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents of this jar with those of `other`.
    pub fn replace(&self, other: SessionJar) {
        let incoming = other
            .store
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        *self.store.write().unwrap_or_else(PoisonError::into_inner) = incoming;
    }

    /// Drops every cookie.
    pub fn clear(&self) {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns `true` when the jar holds no live cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_unexpired()
            .next()
            .is_none()
    }

    /// Names of the live cookies.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_unexpired()
            .map(|cookie| cookie.name().to_string())
            .collect()
    }

    /// Value of a live cookie named `name`.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<String> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_unexpired()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    /// Stores a raw `Set-Cookie` header received from `url`.
    ///
    /// Returns `false` when the header is unusable or rejected (bad syntax,
    /// foreign `Domain`, already expired with nothing to delete).
    pub fn absorb_set_cookie(&self, header: &str, url: &Url) -> bool {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        match store.parse(header, url) {
            Ok(action) => {
                trace!(?action, url = %url, "stored cookie");
                true
            }
            Err(error) => {
                debug!(error = %error, url = %url, "ignoring Set-Cookie header");
                false
            }
        }
    }

    /// `Cookie` header value for a request to `url`, if any cookie applies.
    #[must_use]
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let pairs: Vec<String> = store
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

impl fmt::Debug for SessionJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values are session secrets; only names are shown.
        f.debug_struct("SessionJar")
            .field("cookies", &self.names())
            .finish()
    }
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies = cookie_headers
            .filter_map(|header| header.to_str().ok())
            .filter_map(|raw| RawCookie::parse(raw.to_string()).ok());
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .store_response_cookies(cookies, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}

#[derive(Serialize)]
struct BlobOut<'a> {
    version: u32,
    cookies: Vec<&'a StoredCookie>,
}

#[derive(Deserialize)]
struct BlobIn {
    version: u32,
    cookies: Vec<StoredCookie>,
}

/// Serializes a jar into the persisted blob format. Session cookies are
/// kept; BOCA's challenge cookie is one.
///
/// # Errors
///
/// Returns [`JarError::Malformed`] if JSON encoding fails.
pub fn serialize(jar: &SessionJar) -> Result<String, JarError> {
    let store = jar.store.read().unwrap_or_else(PoisonError::into_inner);
    let blob = BlobOut {
        version: BLOB_VERSION,
        cookies: store.iter_unexpired().collect(),
    };
    Ok(serde_json::to_string(&blob)?)
}

/// Restores a jar from a blob produced by [`serialize`]. Cookies that
/// expired while stored are dropped.
///
/// # Errors
///
/// Returns [`JarError`] when the blob is malformed or from another version.
pub fn deserialize(blob: &str) -> Result<SessionJar, JarError> {
    let decoded: BlobIn = serde_json::from_str(blob)?;
    if decoded.version != BLOB_VERSION {
        return Err(JarError::UnsupportedVersion(decoded.version));
    }
    debug!(cookies = decoded.cookies.len(), "restored cookie jar");
    let store =
        RfcCookieStore::from_cookies(decoded.cookies.into_iter().map(Ok::<_, Infallible>), false)
            .unwrap_or_else(|never| match never {});
    Ok(SessionJar {
        store: RwLock::new(store),
    })
}
