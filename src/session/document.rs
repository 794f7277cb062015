//! Fetched pages and the markers used to read session state from them.
//!
//! BOCA exposes no API, so login success, session expiry, and server
//! identity are all read from fixed fragments of the rendered HTML. Each
//! check lives in exactly one function here so the matching can be changed
//! in one place if the server's markup changes.

use std::sync::LazyLock;

use regex::Regex;

/// Inline script BOCA renders when the session has lapsed.
pub const SESSION_EXPIRED_MARKER: &str = "alert('Session expired. You must log in again.');";

/// Client-side redirect BOCA renders after a successful team login.
pub const LOGIN_SUCCESS_MARKER: &str = "document.location='team/index.php'";

#[allow(clippy::expect_used)]
static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static BOCA_LOGIN_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^BOCA Online Contest Administrator boca-[.0-9]+ - Login$")
        .expect("signature regex is valid") // Static pattern, safe to panic
});

/// A page returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    url: Option<String>,
    html: String,
}

impl Document {
    /// Wraps the body fetched from `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            html: html.into(),
        }
    }

    /// The unauthenticated placeholder returned when there is nothing to fetch.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// `true` for the placeholder from [`Document::empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.html.is_empty()
    }

    /// URL the document was fetched from, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Raw HTML.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Consumes the document, returning the raw HTML.
    #[must_use]
    pub fn into_html(self) -> String {
        self.html
    }

    /// See [`is_session_active`].
    #[must_use]
    pub fn is_session_active(&self) -> bool {
        is_session_active(&self.html)
    }

    /// Text of the first `<title>` element, trimmed.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        page_title(&self.html)
    }
}

/// `false` iff `html` carries the session-expired alert.
///
/// This is the only "logged in" oracle in the crate. It is pure and must be
/// evaluated on every fetched body; results are never cached.
#[must_use]
pub fn is_session_active(html: &str) -> bool {
    !html.contains(SESSION_EXPIRED_MARKER)
}

/// `true` when a login response redirects to the team landing page.
#[must_use]
pub fn is_login_successful(html: &str) -> bool {
    html.contains(LOGIN_SUCCESS_MARKER)
}

/// `true` when `title` is the title of a BOCA login page.
#[must_use]
pub fn is_boca_login_title(title: &str) -> bool {
    BOCA_LOGIN_TITLE.is_match(title)
}

fn page_title(html: &str) -> Option<String> {
    TITLE_PATTERN
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|title| title.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
}
