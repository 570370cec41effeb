//! Encrypted secret store
//!
//! Tool tokens are sealed with ChaCha20-Poly1305 under a per-installation
//! 256-bit key kept in a file next to the user's data. Each call uses a fresh
//! 96-bit nonce. Tokens are encoded as `hex(nonce):hex(tag):hex(ciphertext)`.

use std::fs;
use std::io::Write;
use std::path::Path;

use chacha20poly1305::aead::rand_core::RngCore;
use chacha20poly1305::aead::{AeadInPlace, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce, Tag};
use tracing::{info, warn};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("malformed secret token: {0}")]
    Malformed(&'static str),
    #[error("secret failed authentication (wrong key or tampered data)")]
    Corrupted,
    #[error("decrypted secret is not valid UTF-8")]
    InvalidUtf8,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("invalid key file: {0}")]
    InvalidKey(String),
    #[error("key file I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Symmetric encryption for small secrets.
#[derive(Clone)]
pub struct SecretStore {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore").finish_non_exhaustive()
    }
}

impl SecretStore {
    /// Load the key at `path`, creating it on first use.
    pub fn open(path: &Path) -> Result<Self, SecretError> {
        let key = load_or_create_key(path)?;
        Ok(Self { key })
    }

    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Store with a throwaway random key.
    pub fn ephemeral() -> Self {
        Self { key: generate_key() }
    }

    /// Encrypt a secret. The empty string stays empty.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecretError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let cipher = ChaCha20Poly1305::new((&self.key).into());
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = cipher
            .encrypt_in_place_detached(nonce, b"", &mut buffer)
            .map_err(|_| SecretError::EncryptionFailed)?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(tag),
            hex::encode(buffer)
        ))
    }

    /// Decrypt a token produced by [`SecretStore::encrypt`].
    ///
    /// The empty string decrypts to the empty string; every other failure is
    /// reported with its cause.
    pub fn decrypt(&self, token: &str) -> Result<String, SecretError> {
        if token.is_empty() {
            return Ok(String::new());
        }

        let parts: Vec<&str> = token.split(':').collect();
        let [nonce_hex, tag_hex, data_hex] = parts.as_slice() else {
            return Err(SecretError::Malformed("expected nonce:tag:ciphertext"));
        };

        let nonce_bytes =
            hex::decode(nonce_hex).map_err(|_| SecretError::Malformed("nonce is not hex"))?;
        let tag_bytes = hex::decode(tag_hex).map_err(|_| SecretError::Malformed("tag is not hex"))?;
        let mut buffer =
            hex::decode(data_hex).map_err(|_| SecretError::Malformed("ciphertext is not hex"))?;

        if nonce_bytes.len() != NONCE_LEN {
            return Err(SecretError::Malformed("nonce has wrong length"));
        }
        if tag_bytes.len() != TAG_LEN {
            return Err(SecretError::Malformed("tag has wrong length"));
        }

        let cipher = ChaCha20Poly1305::new((&self.key).into());
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&nonce_bytes),
                b"",
                &mut buffer,
                Tag::from_slice(&tag_bytes),
            )
            .map_err(|_| SecretError::Corrupted)?;

        String::from_utf8(buffer).map_err(|_| SecretError::InvalidUtf8)
    }

    /// Decrypt for read paths: any failure reads as "no secret".
    pub fn decrypt_or_empty(&self, token: &str) -> String {
        match self.decrypt(token) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(error = %e, "stored secret could not be decrypted; treating as empty");
                String::new()
            }
        }
    }
}

fn generate_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

fn load_or_create_key(path: &Path) -> Result<[u8; KEY_LEN], SecretError> {
    if path.exists() {
        let encoded = fs::read_to_string(path)?;
        let bytes = hex::decode(encoded.trim())
            .map_err(|_| SecretError::InvalidKey("key file is not hex".to_string()))?;
        return bytes.try_into().map_err(|b: Vec<u8>| {
            SecretError::InvalidKey(format!("expected {} bytes, found {}", KEY_LEN, b.len()))
        });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let key = generate_key();
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(hex::encode(key).as_bytes())?;

    info!(path = %path.display(), "created secret key");
    Ok(key)
}
