//! Encryption of mailbox secrets at rest.
//!
//! Secrets are sealed with AES-256-GCM under a key derived (Argon2id) from the
//! server's configured secret. The stored form is `base64(nonce || ciphertext)`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

/// Salt for key derivation; changing it invalidates every stored secret.
const KEY_SALT: &[u8] = b"intrahub.credentials.v1";

/// Nonce size for AES-GCM (96 bits).
const NONCE_SIZE: usize = 12;

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Server secret was empty or the KDF failed.
    #[error("Failed to derive encryption key: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("Encryption failed")]
    Encryption,

    /// Decryption failed (wrong key or tampered data).
    #[error("Decryption failed")]
    Decryption,

    /// Stored value is not in the expected format.
    #[error("Invalid encrypted data format: {0}")]
    InvalidFormat(String),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Seals and opens mailbox secrets.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Derive a cipher from the server secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the passphrase is empty or key derivation fails.
    pub fn from_passphrase(passphrase: &str) -> CredentialResult<Self> {
        if passphrase.is_empty() {
            return Err(CredentialError::KeyDerivation(
                "server secret must not be empty".to_string(),
            ));
        }

        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), KEY_SALT, &mut key)
            .map_err(|e| CredentialError::KeyDerivation(e.to_string()))?;

        debug!("Derived credential encryption key");
        Ok(Self {
            cipher: Aes256Gcm::new(&key.into()),
        })
    }

    /// Encrypt a secret for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    pub fn encrypt(&self, plaintext: &str) -> CredentialResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CredentialError::Encryption)?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(combined))
    }

    /// Decrypt a stored secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed or was sealed under another key.
    pub fn decrypt(&self, encoded: &str) -> CredentialResult<String> {
        let combined = BASE64
            .decode(encoded)
            .map_err(|e| CredentialError::InvalidFormat(e.to_string()))?;

        if combined.len() < NONCE_SIZE {
            return Err(CredentialError::InvalidFormat(format!(
                "encrypted data too short: {} bytes",
                combined.len()
            )));
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialError::Decryption)?;

        String::from_utf8(plaintext).map_err(|e| CredentialError::InvalidFormat(e.to_string()))
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialCipher")
    }
}
