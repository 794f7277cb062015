//! Encrypted-at-rest secret store.
//!
//! All keys live in one JSON map, encrypted with XChaCha20-Poly1305 and
//! written to `~/.config/boca-session/secrets.enc` (or
//! `$XDG_CONFIG_HOME/boca-session/secrets.enc`). The encryption key comes
//! from `BOCA_SESSION_MASTER_KEY` or is generated once and kept in the
//! system keychain.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use tracing::{debug, instrument};

use super::{SecretStore, StoreError};
use crate::digest::{hex_encode, sha256_bytes};

const SECRETS_FILE_NAME: &str = "secrets.enc";
const APP_DIR_NAME: &str = "boca-session";
const MASTER_KEY_ENV: &str = "BOCA_SESSION_MASTER_KEY";
const KEYRING_SERVICE: &str = "boca-session";
const KEYRING_ENTRY_NAME: &str = "secret-store-key-v1";
const MAGIC: &[u8; 4] = b"BSS1";
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

/// File-backed [`SecretStore`] encrypted with a key from env or keychain.
pub struct EncryptedFileStore {
    path: PathBuf,
    key_material: String,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStore")
            .field("path", &self.path)
            .field("key_material", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl EncryptedFileStore {
    /// Creates a store at `path` using explicit key material.
    #[must_use]
    pub fn with_key(path: impl Into<PathBuf>, key_material: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key_material: key_material.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Opens the store at `path`, resolving key material from
    /// `BOCA_SESSION_MASTER_KEY` or the system keychain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeychainUnavailable`] when no key can be obtained.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let key = load_or_create_key()?;
        Ok(Self::with_key(path, key))
    }

    /// Opens the store at the default location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if no config directory or key is available.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(default_secrets_path()?)
    }

    /// Location of the encrypted payload.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&self.path)?;
        let plaintext = decrypt_bytes(&bytes, &self.key_material)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn store_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let plaintext = serde_json::to_vec(map)?;
        let encrypted = encrypt_bytes(&plaintext, &self.key_material)?;
        write_encrypted_payload(&self.path, &encrypted)
    }
}

impl SecretStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load_map()?.remove(key))
    }

    #[instrument(level = "debug", skip(self, value), fields(path = %self.path.display()))]
    fn update(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load_map()?;
        match value {
            Some(value) => {
                map.insert(key.to_string(), value.to_string());
            }
            None => {
                if map.remove(key).is_none() {
                    return Ok(());
                }
            }
        }
        self.store_map(&map)?;
        debug!(present = value.is_some(), "secret store updated");
        Ok(())
    }
}

/// Returns the default store path (`~/.config/boca-session/secrets.enc`).
///
/// # Errors
///
/// Returns [`StoreError::ConfigDirUnavailable`] if no usable config dir is found.
pub fn default_secrets_path() -> Result<PathBuf, StoreError> {
    Ok(default_config_dir()?.join(SECRETS_FILE_NAME))
}

fn default_config_dir() -> Result<PathBuf, StoreError> {
    resolve_config_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }

    Some(PathBuf::from(value))
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, StoreError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR_NAME));
    }

    Err(StoreError::ConfigDirUnavailable)
}

fn load_or_create_key() -> Result<String, StoreError> {
    if let Some(from_env) = env::var_os(MASTER_KEY_ENV) {
        let key = from_env.to_string_lossy().trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }

    let entry = safe_keyring_entry()?;

    match safe_keyring_get_password(&entry) {
        Ok(existing) if !existing.trim().is_empty() => Ok(existing),
        _ => {
            let generated = generate_key_material();
            safe_keyring_set_password(&entry, &generated)?;
            Ok(generated)
        }
    }
}

// keyring backends can panic when no secret service is reachable.
fn safe_keyring_entry() -> Result<keyring::Entry, StoreError> {
    catch_unwind(|| keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY_NAME))
        .map_err(|_| StoreError::KeychainUnavailable)?
        .map_err(|_| StoreError::KeychainUnavailable)
}

fn safe_keyring_get_password(entry: &keyring::Entry) -> Result<String, StoreError> {
    catch_unwind(AssertUnwindSafe(|| entry.get_password()))
        .map_err(|_| StoreError::KeychainUnavailable)?
        .map_err(|_| StoreError::KeychainUnavailable)
}

fn safe_keyring_set_password(entry: &keyring::Entry, password: &str) -> Result<(), StoreError> {
    catch_unwind(AssertUnwindSafe(|| entry.set_password(password)))
        .map_err(|_| StoreError::KeychainUnavailable)?
        .map_err(|_| StoreError::KeychainUnavailable)
}

fn generate_key_material() -> String {
    let mut bytes = [0_u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn write_encrypted_payload(path: &Path, payload: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Write-then-rename so readers never see a truncated payload.
    let staging = path.with_extension("enc.tmp");
    fs::write(&staging, payload)?;
    set_owner_only_permissions(&staging)?;
    fs::rename(&staging, path)?;
    Ok(())
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

fn encrypt_bytes(plaintext: &[u8], key_material: &str) -> Result<Vec<u8>, StoreError> {
    let key_bytes = sha256_bytes(key_material);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));

    let mut nonce = [0_u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let nonce_ref = XNonce::from_slice(&nonce);

    let ciphertext = cipher
        .encrypt(nonce_ref, plaintext)
        .map_err(|_| StoreError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(MAGIC);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn decrypt_bytes(payload: &[u8], key_material: &str) -> Result<Vec<u8>, StoreError> {
    if payload.len() < MAGIC.len() + NONCE_LEN || &payload[..MAGIC.len()] != MAGIC {
        return Err(StoreError::InvalidPayload);
    }

    let key_bytes = sha256_bytes(key_material);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));
    let nonce_start = MAGIC.len();
    let nonce_end = nonce_start + NONCE_LEN;
    let nonce = XNonce::from_slice(&payload[nonce_start..nonce_end]);
    let ciphertext = &payload[nonce_end..];

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| StoreError::DecryptionFailed)
}
