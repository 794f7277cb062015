//! Credentials and the BOCA challenge-response login.
//!
//! This module provides:
//! - [`Credentials`] / [`CredentialStore`]: the persisted account triple
//! - [`authenticate`]: the login handshake answering a `PHPSESSID` challenge
//! - [`probe_entry_page`]: the bounded check that a host runs BOCA

mod challenge;
mod credentials;
mod probe;

pub use challenge::{CHALLENGE_COOKIE, ENTRY_PATH, authenticate, login_hash};
pub use credentials::{CredentialStore, Credentials};
pub use probe::{PROBE_TIMEOUT, probe_entry_page};
