//! Message encryption using `XChaCha20-Poly1305`
//!
//! All functions are pure - random bytes must be provided by the caller.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use super::{error::SenderKeyError, ratchet::MessageKey};

/// Size of the random suffix in the nonce (20 bytes)
pub const NONCE_RANDOM_SIZE: usize = 20;

/// Size of the full `XChaCha20` nonce
const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
const POLY1305_TAG_SIZE: usize = 16;

/// An encrypted message with the ratchet index needed to decrypt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    /// Ratchet index the message key was derived at
    pub index: u32,
    /// The 24-byte `XChaCha20` nonce
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext including 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
}

impl EncryptedMessage {
    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(POLY1305_TAG_SIZE)
    }

    /// Encode as `index (u32 BE) || body`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.index.to_be_bytes());
        out.extend_from_slice(&self.body());
        out
    }

    /// The part after the index: `nonce || ciphertext`.
    pub fn body(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Rebuild a message from its index and `nonce || ciphertext` body.
    pub fn from_body(index: u32, body: &[u8]) -> Result<Self, SenderKeyError> {
        if body.len() < NONCE_SIZE + POLY1305_TAG_SIZE {
            return Err(SenderKeyError::MalformedMessage {
                reason: format!(
                    "body is {} bytes, need at least {}",
                    body.len(),
                    NONCE_SIZE + POLY1305_TAG_SIZE
                ),
            });
        }

        let (nonce_bytes, ciphertext) = body.split_at(NONCE_SIZE);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);

        Ok(Self { index, nonce, ciphertext: ciphertext.to_vec() })
    }

    /// Decode the output of [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, SenderKeyError> {
        let Some((index_bytes, body)) = bytes.split_first_chunk::<4>() else {
            return Err(SenderKeyError::MalformedMessage {
                reason: "missing ratchet index".to_string(),
            });
        };
        Self::from_body(u32::from_be_bytes(*index_bytes), body)
    }
}

/// Encrypt a message using `XChaCha20-Poly1305`.
///
/// `aad` is authenticated but not encrypted. Caller MUST provide
/// cryptographically secure random bytes in production.
pub fn encrypt_message(
    plaintext: &[u8],
    aad: &[u8],
    message_key: &MessageKey,
    random_suffix: [u8; NONCE_RANDOM_SIZE],
) -> EncryptedMessage {
    let nonce = build_nonce(message_key.index(), random_suffix);
    let cipher = XChaCha20Poly1305::new(message_key.key().into());

    let Ok(ciphertext) =
        cipher.encrypt(XNonce::from_slice(&nonce), Payload { msg: plaintext, aad })
    else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    EncryptedMessage { index: message_key.index(), nonce, ciphertext }
}

/// Decrypt a message using `XChaCha20-Poly1305`.
///
/// # Errors
///
/// - `DecryptionFailed`: key index mismatch, wrong key, or tampered bytes
pub fn decrypt_message(
    encrypted: &EncryptedMessage,
    aad: &[u8],
    message_key: &MessageKey,
) -> Result<Vec<u8>, SenderKeyError> {
    if message_key.index() != encrypted.index {
        return Err(SenderKeyError::DecryptionFailed {
            reason: format!(
                "index mismatch: key is {}, message is {}",
                message_key.index(),
                encrypted.index
            ),
        });
    }

    let cipher = XChaCha20Poly1305::new(message_key.key().into());
    let nonce = XNonce::from_slice(&encrypted.nonce);

    cipher
        .decrypt(nonce, Payload { msg: encrypted.ciphertext.as_slice(), aad })
        .map_err(|_| SenderKeyError::DecryptionFailed {
            reason: "authentication failed".to_string(),
        })
}

/// Build a 24-byte nonce: index (4 bytes BE) followed by the random suffix.
fn build_nonce(index: u32, random_suffix: [u8; NONCE_RANDOM_SIZE]) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[0..4].copy_from_slice(&index.to_be_bytes());
    nonce[4..].copy_from_slice(&random_suffix);
    nonce
}
