//! BOCA Session Library
//!
//! Authenticated session client for BOCA (BOCA Online Contest Administrator)
//! servers. It keeps a team logged in across calls: credentials and the
//! cookie jar are persisted in a [`SecretStore`], expired sessions are
//! detected from page content and repaired with a bounded re-login, and
//! files are downloaded and forms submitted with the live session.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Credentials, the challenge-response login, and the host probe
//! - [`session`] - Cookie jar codec, expiry detection, and the [`Session`] manager
//! - [`store`] - Secret storage backends
//! - [`transfer`] - Streaming downloads and multipart uploads
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use boca_session::{Credentials, MemoryStore, Session};
//!
//! # async fn run() -> Result<(), boca_session::SessionError> {
//! let session = Session::new(Arc::new(MemoryStore::new()))?;
//! session
//!     .login(&Credentials::new("10.0.0.5", "team1", "secret"))
//!     .await?;
//! let page = session.fetch_authenticated("team/problem.php").await?;
//! println!("{}", page.html());
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
mod digest;
pub mod error;
pub mod session;
pub mod store;
pub mod transfer;
mod user_agent;

// Re-export commonly used types
pub use auth::{CredentialStore, Credentials};
pub use error::SessionError;
pub use session::{
    Document, JarError, PROTECTED_PATH, PageExtractor, Session, SessionJar, SessionState,
};
pub use store::{EncryptedFileStore, MemoryStore, SecretStore, StoreError};
pub use transfer::{Clarification, FORCED_DOWNLOAD_TYPE, RunSubmission, UploadForm};
