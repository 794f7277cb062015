//! Key-value secret storage backing credentials and the cookie jar.
//!
//! The session layer only ever talks to [`SecretStore`]; the concrete store
//! decides where values live. Two keys are used:
//! - [`CREDENTIALS_KEY`] - the serialized [`Credentials`](crate::Credentials)
//! - [`COOKIE_JAR_KEY`] - the serialized cookie jar blob

mod encrypted;
mod memory;

pub use encrypted::{EncryptedFileStore, default_secrets_path};
pub use memory::MemoryStore;

/// Store key for persisted credentials.
pub const CREDENTIALS_KEY: &str = "credentials";

/// Store key for the persisted cookie jar blob.
pub const COOKIE_JAR_KEY: &str = "cookieJar";

/// Errors for secret store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No suitable user config directory is available.
    #[error("unable to determine config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Could not access keychain and no env fallback key was provided.
    #[error(
        "unable to access system keychain for the store encryption key; set BOCA_SESSION_MASTER_KEY or configure keychain access"
    )]
    KeychainUnavailable,
    /// Stored encrypted payload is malformed.
    #[error("persisted secret payload is invalid")]
    InvalidPayload,
    /// Encryption failed.
    #[error("failed to encrypt secret store")]
    EncryptionFailed,
    /// Decryption failed.
    #[error("failed to decrypt secret store")]
    DecryptionFailed,
}

/// Durable key-value storage for session secrets.
///
/// Both operations are expected to be atomic: a reader never observes a
/// half-written value.
pub trait SecretStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if never set or cleared.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, or removes the key when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be written.
    fn update(&self, key: &str, value: Option<&str>) -> Result<(), StoreError>;
}
