//! Streaming downloads and form uploads outside the managed cookie jar.
//!
//! Transfers send the session as an explicit `Cookie` header, built for the
//! target URL so a link to another host never carries the BOCA session. A
//! download is idempotent, so an expired session is repaired and the
//! download retried once; an upload is a contest submission and is never
//! retried.

mod forms;

use std::path::Path;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use forms::{Clarification, RunSubmission, UploadForm, mime_for};

use crate::auth::Credentials;
use crate::error::SessionError;
use crate::session::{Document, MAX_AUTH_ATTEMPTS, PROTECTED_PATH, Session, is_session_active};

/// Content type BOCA uses for problem statements and submitted sources.
pub const FORCED_DOWNLOAD_TYPE: &str = "application/force-download";

/// Download attempts per call: the first, plus one after re-login.
const MAX_DOWNLOAD_ATTEMPTS: u32 = 2;

enum DownloadOutcome {
    Saved(u64),
    SessionExpired,
}

impl Session {
    /// Streams the file at `url` to `destination`, returning bytes written.
    ///
    /// `url` may be absolute or relative to `http://{host}/boca/`. If the
    /// server answers with its expired-session page, the session is logged
    /// in again and the download retried exactly once. Logins made before
    /// the first attempt and before the retry share one budget of two.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotLoggedIn`] without stored credentials
    /// - [`SessionError::UnexpectedResponse`] for HTML without the expiry
    ///   marker, an unknown content type, or an error status
    /// - [`SessionError::AuthenticationFailed`] when the session is still
    ///   expired after re-login
    #[instrument(skip(self, destination), fields(destination = %destination.display()))]
    pub async fn download(&self, url: &str, destination: &Path) -> Result<u64, SessionError> {
        let _guard = self.op_lock.lock().await;
        let credentials = self.credentials().get()?.ok_or(SessionError::NotLoggedIn)?;
        let url = resolve_url(&credentials, url)?;
        let mut attempts_left = MAX_AUTH_ATTEMPTS;

        for attempt in 1..=MAX_DOWNLOAD_ATTEMPTS {
            self.ensure_jar(&credentials, &mut attempts_left).await?;
            let cookie = self.header_for(&url);
            match self
                .download_once(&url, cookie.as_deref(), destination)
                .await?
            {
                DownloadOutcome::Saved(bytes) => {
                    info!(url = %url, bytes, "download complete");
                    return Ok(bytes);
                }
                DownloadOutcome::SessionExpired if attempt < MAX_DOWNLOAD_ATTEMPTS => {
                    info!(url = %url, "session expired during download, logging in again");
                    self.fetch_with_budget(PROTECTED_PATH, &mut attempts_left)
                        .await?;
                }
                DownloadOutcome::SessionExpired => {}
            }
        }

        warn!(url = %url, "session still expired after re-login");
        Err(SessionError::authentication_failed(&credentials.host))
    }

    /// Posts `form` as multipart data to `endpoint` (relative to
    /// `http://{host}/boca/`) and returns the response page.
    ///
    /// Sent exactly once. A response showing an expired session is returned
    /// as is; resubmitting could duplicate a run or clarification.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotLoggedIn`] without stored credentials
    /// - [`SessionError::Io`] when a file field cannot be read
    /// - [`SessionError::UnexpectedResponse`] for an error status
    #[instrument(skip(self, form))]
    pub async fn upload(&self, endpoint: &str, form: UploadForm) -> Result<Document, SessionError> {
        let _guard = self.op_lock.lock().await;
        let credentials = self.credentials().get()?.ok_or(SessionError::NotLoggedIn)?;
        let url = credentials.endpoint(endpoint)?;
        let multipart = form.into_multipart().await?;
        let mut attempts_left = MAX_AUTH_ATTEMPTS;
        self.ensure_jar(&credentials, &mut attempts_left).await?;

        let mut request = self.transfer_client.post(url.clone()).multipart(multipart);
        if let Some(cookie) = self.header_for(&url) {
            request = request.header(COOKIE, cookie);
        }
        let response = request
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

        let document = Document::new(url, html);
        if document.is_session_active() {
            info!("upload accepted");
        } else {
            warn!("upload answered with an expired session; not resubmitting");
        }
        Ok(document)
    }

    /// Submits a run to [`RunSubmission::ENDPOINT`].
    ///
    /// # Errors
    ///
    /// Same as [`upload`](Self::upload).
    pub async fn submit_run(&self, run: RunSubmission) -> Result<Document, SessionError> {
        self.upload(RunSubmission::ENDPOINT, run.into_form()).await
    }

    /// Submits a clarification request to [`Clarification::ENDPOINT`].
    ///
    /// # Errors
    ///
    /// Same as [`upload`](Self::upload).
    pub async fn submit_clarification(
        &self,
        clarification: Clarification,
    ) -> Result<Document, SessionError> {
        self.upload(Clarification::ENDPOINT, clarification.into_form())
            .await
    }

    async fn download_once(
        &self,
        url: &Url,
        cookie: Option<&str>,
        destination: &Path,
    ) -> Result<DownloadOutcome, SessionError> {
        let mut request = self.transfer_client.get(url.clone());
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        } else {
            debug!(url = %url, "no session cookie applies to this URL");
        }
        let response = request
            .send()
            .await
            .map_err(|e| SessionError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::unexpected(url.as_str(), format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(media_type)
            .unwrap_or_default();
        debug!(content_type = %content_type, "download response received");

        match content_type.as_str() {
            FORCED_DOWNLOAD_TYPE => stream_to_file(response, url, destination)
                .await
                .map(DownloadOutcome::Saved),
            "text/html" => {
                let html = response
                    .text()
                    .await
                    .map_err(|e| SessionError::network(url.as_str(), e))?;
                if is_session_active(&html) {
                    Err(SessionError::unexpected(
                        url.as_str(),
                        "got an HTML page instead of a file, check the URL",
                    ))
                } else {
                    Ok(DownloadOutcome::SessionExpired)
                }
            }
            other => Err(SessionError::unexpected(
                url.as_str(),
                format!("unsupported content type {other:?}"),
            )),
        }
    }
}

/// Absolute URLs are used as is; anything else is a BOCA path.
fn resolve_url(credentials: &Credentials, url: &str) -> Result<Url, SessionError> {
    match Url::parse(url) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => credentials.endpoint(url),
        Err(_) => Err(SessionError::invalid_url(url)),
    }
}

/// Lowercased media type without parameters (`text/html; charset=UTF-8` -> `text/html`).
fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Writes the response body to `destination`; a partial file is removed on error.
async fn stream_to_file(
    response: reqwest::Response,
    url: &Url,
    destination: &Path,
) -> Result<u64, SessionError> {
    let file = File::create(destination)
        .await
        .map_err(|e| SessionError::io(destination, e))?;

    let result = write_body(file, response, url, destination).await;
    if result.is_err() {
        debug!(path = %destination.display(), "cleaning up partial file after error");
        let _ = tokio::fs::remove_file(destination).await;
    }
    result
}

async fn write_body(
    file: File,
    response: reqwest::Response,
    url: &Url,
    destination: &Path,
) -> Result<u64, SessionError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| SessionError::network(url.as_str(), e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| SessionError::io(destination, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| SessionError::io(destination, e))?;
    Ok(bytes_written)
}
