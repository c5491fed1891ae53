//! Encryption at rest for per-user provider API keys.
//!
//! Ciphertexts are framed as `aes256gcm:<b64 nonce>:<b64 ciphertext>` with
//! the AES-256 key derived as SHA-256 of the configured secret. The framing
//! is part of the stored-data contract; changing it orphans every saved key.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Scheme tag of the on-disk framing.
const SCHEME: &str = "aes256gcm";

/// AES-GCM standard 96-bit nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Errors from credential encryption or decryption.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The ciphertext does not use the `aes256gcm:<nonce>:<ct>` framing.
    #[error("Unsupported credential encryption scheme")]
    UnsupportedScheme,

    /// Sealing a plaintext failed.
    #[error("Credential encryption failed")]
    EncryptFailed,

    /// A framing segment was not valid base64.
    #[error("Invalid credential encoding: {0}")]
    InvalidEncoding(String),

    /// Authentication failed: wrong secret or tampered ciphertext.
    #[error("Credential decryption failed")]
    DecryptFailed,

    /// The decrypted bytes were not UTF-8 text.
    #[error("Decrypted credential is not valid UTF-8")]
    InvalidUtf8,
}

/// Derive the AES-256 key from the configured secret.
fn derive_key(secret: &str) -> Key<Aes256Gcm> {
    let digest = Sha256::digest(secret.as_bytes());
    Key::<Aes256Gcm>::clone_from_slice(digest.as_slice())
}

/// Encrypt a plaintext credential for storage.
pub fn encrypt_text(plaintext: &str, secret: &str) -> Result<String, CredentialError> {
    let cipher = Aes256Gcm::new(&derive_key(secret));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CredentialError::EncryptFailed)?;

    Ok(format!(
        "{SCHEME}:{}:{}",
        BASE64.encode(nonce),
        BASE64.encode(ciphertext)
    ))
}

/// Decrypt a stored credential.
pub fn decrypt_text(encrypted: &str, secret: &str) -> Result<String, CredentialError> {
    let mut parts = encrypted.splitn(3, ':');
    let (scheme, nonce_b64, ct_b64) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(nonce), Some(ct)) => (scheme, nonce, ct),
        _ => return Err(CredentialError::UnsupportedScheme),
    };
    if scheme != SCHEME {
        return Err(CredentialError::UnsupportedScheme);
    }

    let nonce_bytes = BASE64
        .decode(nonce_b64)
        .map_err(|e| CredentialError::InvalidEncoding(e.to_string()))?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(CredentialError::InvalidEncoding(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce_bytes.len()
        )));
    }
    let ciphertext = BASE64
        .decode(ct_b64)
        .map_err(|e| CredentialError::InvalidEncoding(e.to_string()))?;

    let cipher = Aes256Gcm::new(&derive_key(secret));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| CredentialError::DecryptFailed)?;

    String::from_utf8(plaintext).map_err(|_| CredentialError::InvalidUtf8)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
