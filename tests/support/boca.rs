//! A scripted BOCA server on wiremock plus helpers to seed session state.

use std::sync::Arc;

use boca_session::auth::login_hash;
use boca_session::session::{SessionJar, jar};
use boca_session::store::{COOKIE_JAR_KEY, CREDENTIALS_KEY};
use boca_session::{Credentials, MemoryStore, SecretStore, Session};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use super::socket_guard::start_mock_server_or_skip;

pub const TEAM: &str = "team1";
pub const PASSWORD: &str = "secret";
pub const HTML: &str = "text/html; charset=UTF-8";

pub const LOGIN_PAGE: &str = include_str!("../fixtures/login_page.html");
pub const LOGIN_SUCCESS: &str = include_str!("../fixtures/login_success.html");
pub const SESSION_EXPIRED: &str = include_str!("../fixtures/session_expired.html");
pub const TEAM_INDEX: &str = include_str!("../fixtures/team_index.html");

/// Matches requests without a query string.
pub struct NoQuery;

impl Match for NoQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query().is_none()
    }
}

/// Matches requests whose `Cookie` header contains the given `name=value` pair.
pub struct CookieContains(pub String);

impl Match for CookieContains {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|cookies| cookies.split("; ").any(|pair| pair == self.0))
    }
}

/// Matches requests sent without any `Cookie` header.
pub struct NoCookie;

impl Match for NoCookie {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("cookie")
    }
}

pub fn challenge_cookie(challenge: &str) -> CookieContains {
    CookieContains(format!("PHPSESSID={challenge}"))
}

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), HTML)
}

/// Mock BOCA server rooted at `/boca/`.
pub struct MockBoca {
    pub server: MockServer,
}

impl MockBoca {
    pub async fn start() -> Option<Self> {
        let server = start_mock_server_or_skip().await?;
        Some(Self { server })
    }

    /// `host:port` as stored in credentials.
    pub fn host(&self) -> String {
        self.server.address().to_string()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.host(), TEAM, PASSWORD)
    }

    pub fn url(&self, page: &str) -> String {
        format!("{}/boca/{page}", self.server.uri())
    }

    /// Entry page issuing `challenge` as the session cookie.
    pub fn entry_page(&self, challenge: &str) -> Mock {
        Mock::given(method("GET"))
            .and(path("/boca/index.php"))
            .and(NoQuery)
            .respond_with(
                html(LOGIN_PAGE)
                    .insert_header("set-cookie", format!("PHPSESSID={challenge}; path=/").as_str()),
            )
    }

    /// Login request answering `challenge` with the right password.
    pub fn login(&self, challenge: &str, accept: bool) -> Mock {
        Mock::given(method("GET"))
            .and(path("/boca/index.php"))
            .and(query_param("name", TEAM))
            .and(query_param("password", login_hash(PASSWORD, challenge).as_str()))
            .respond_with(html(if accept { LOGIN_SUCCESS } else { LOGIN_PAGE }))
    }

    /// Accepted login answering `challenge` that also sets `set_cookie`.
    pub fn login_setting_cookie(&self, challenge: &str, set_cookie: &str) -> Mock {
        Mock::given(method("GET"))
            .and(path("/boca/index.php"))
            .and(query_param("name", TEAM))
            .and(query_param("password", login_hash(PASSWORD, challenge).as_str()))
            .respond_with(html(LOGIN_SUCCESS).insert_header("set-cookie", set_cookie))
    }

    /// Any login attempt at all, for asserting none happen.
    pub fn any_login(&self) -> Mock {
        Mock::given(method("GET"))
            .and(path("/boca/index.php"))
            .and(query_param("name", TEAM))
            .respond_with(html(LOGIN_PAGE))
    }

    /// `page` rendered as logged in for the session `challenge`.
    pub fn active_page(&self, page: &str, challenge: &str) -> Mock {
        Mock::given(method("GET"))
            .and(path(format!("/boca/{page}")))
            .and(challenge_cookie(challenge))
            .respond_with(html(TEAM_INDEX))
    }

    /// `page` answering with the expired-session alert.
    pub fn expired_page(&self, page: &str) -> Mock {
        Mock::given(method("GET"))
            .and(path(format!("/boca/{page}")))
            .respond_with(html(SESSION_EXPIRED))
    }

    /// Stores credentials and a jar holding `challenge` in `store`.
    pub fn seed_session(&self, store: &MemoryStore, challenge: &str) {
        seed_credentials(store, &self.credentials());
        let stored = SessionJar::new();
        let entry = url::Url::parse(&self.url("index.php")).unwrap();
        assert!(stored.absorb_set_cookie(&format!("PHPSESSID={challenge}; path=/"), &entry));
        store
            .update(COOKIE_JAR_KEY, Some(&jar::serialize(&stored).unwrap()))
            .unwrap();
    }
}

pub fn seed_credentials(store: &MemoryStore, credentials: &Credentials) {
    store
        .update(
            CREDENTIALS_KEY,
            Some(&serde_json::to_string(credentials).unwrap()),
        )
        .unwrap();
}

pub fn new_session() -> (Arc<MemoryStore>, Session) {
    let store = Arc::new(MemoryStore::new());
    let session = Session::new(store.clone()).unwrap();
    (store, session)
}

/// Value of the challenge cookie in the persisted jar, if any.
pub fn stored_challenge(store: &MemoryStore) -> Option<String> {
    stored_cookie(store, "PHPSESSID")
}

/// Value of cookie `name` in the persisted jar, if any.
pub fn stored_cookie(store: &MemoryStore, name: &str) -> Option<String> {
    let blob = store.get(COOKIE_JAR_KEY).unwrap()?;
    jar::deserialize(&blob).unwrap().value_of(name)
}
