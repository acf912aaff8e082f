//! Outbound sessions and exportable session keys.

use zeroize::Zeroize;

use super::{
    encryption::{EncryptedMessage, NONCE_RANDOM_SIZE, decrypt_message, encrypt_message},
    error::SenderKeyError,
    ratchet::{MAX_SKIP, SymmetricRatchet},
};

/// Version byte prefixed to encoded session keys
const SESSION_KEY_VERSION: u8 = 1;

/// Encoded length: version (1) + index (4) + chain key (32)
const SESSION_KEY_LEN: usize = 37;

/// Ratchet position exported by a sender so recipients can decrypt from
/// `index` onwards.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    index: u32,
    chain_key: [u8; 32],
}

impl SessionKey {
    /// First ratchet index this key can derive.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Encode as `version || index (u32 BE) || chain key`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SESSION_KEY_LEN);
        out.push(SESSION_KEY_VERSION);
        out.extend_from_slice(&self.index.to_be_bytes());
        out.extend_from_slice(&self.chain_key);
        out
    }

    /// Decode the output of [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, SenderKeyError> {
        if bytes.len() != SESSION_KEY_LEN {
            return Err(SenderKeyError::InvalidSessionKey {
                reason: format!("expected {SESSION_KEY_LEN} bytes, got {}", bytes.len()),
            });
        }

        if bytes[0] != SESSION_KEY_VERSION {
            return Err(SenderKeyError::InvalidSessionKey {
                reason: format!("unsupported version {}", bytes[0]),
            });
        }

        let mut index = [0u8; 4];
        index.copy_from_slice(&bytes[1..5]);
        let mut chain_key = [0u8; 32];
        chain_key.copy_from_slice(&bytes[5..]);

        Ok(Self { index: u32::from_be_bytes(index), chain_key })
    }

    /// Fresh ratchet positioned at this key's index.
    pub fn ratchet(&self) -> SymmetricRatchet {
        SymmetricRatchet::from_parts(self.chain_key, self.index)
    }

    /// Whether `later` is this key's ratchet stepped forward to
    /// `later.index()`.
    ///
    /// Keys further apart than [`MAX_SKIP`] cannot be compared.
    pub fn precedes(&self, later: &SessionKey) -> Result<bool, SenderKeyError> {
        if later.index < self.index {
            return Ok(false);
        }

        if later.index - self.index > MAX_SKIP {
            return Err(SenderKeyError::IndexTooFarAhead {
                current: self.index,
                requested: later.index,
            });
        }

        let mut ratchet = self.ratchet();
        while ratchet.index() < later.index {
            ratchet.advance()?;
        }

        Ok(ratchet.chain_key() == &later.chain_key)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey").field("index", &self.index).finish_non_exhaustive()
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.chain_key.zeroize();
    }
}

/// Sending half of a group session.
pub struct OutboundSession {
    ratchet: SymmetricRatchet,
}

impl OutboundSession {
    /// Start a session at index 0 from a random seed.
    pub fn new(seed: &[u8; 32]) -> Self {
        Self { ratchet: SymmetricRatchet::new(seed) }
    }

    /// Index the next encrypted message will carry.
    pub fn message_index(&self) -> u32 {
        self.ratchet.index()
    }

    /// Export the current ratchet position for recipients.
    ///
    /// Recipients of this key cannot decrypt messages sent before it.
    pub fn session_key(&self) -> SessionKey {
        SessionKey { index: self.ratchet.index(), chain_key: *self.ratchet.chain_key() }
    }

    /// Encrypt the next message and advance the ratchet.
    pub fn encrypt(
        &mut self,
        plaintext: &[u8],
        aad: &[u8],
        random_suffix: [u8; NONCE_RANDOM_SIZE],
    ) -> Result<EncryptedMessage, SenderKeyError> {
        let message_key = self.ratchet.advance()?;
        Ok(encrypt_message(plaintext, aad, &message_key, random_suffix))
    }
}

/// Decrypt `encrypted` with an inbound copy of the session.
///
/// The key itself is never advanced, so any index at or after
/// `session_key.index()` stays decryptable.
pub fn decrypt_with_session_key(
    session_key: &SessionKey,
    encrypted: &EncryptedMessage,
    aad: &[u8],
) -> Result<Vec<u8>, SenderKeyError> {
    if encrypted.index < session_key.index {
        return Err(SenderKeyError::IndexUnavailable {
            first_known: session_key.index,
            requested: encrypted.index,
        });
    }

    let message_key = session_key.ratchet().advance_to(encrypted.index)?;
    decrypt_message(encrypted, aad, &message_key)
}
