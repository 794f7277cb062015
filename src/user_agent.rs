//! User-Agent string shared by the session and transfer HTTP clients.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/boca-session/boca-session";

/// Default User-Agent for every request the session makes.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("boca-session/{version} (contest-client; +{PROJECT_UA_URL})")
}
