//! Ratchet engine boundary.
//!
//! The core treats the ratchet as a black box behind [`RatchetEngine`]. The
//! bundled [`SenderKeyEngine`] backs it with `roomkey-crypto`.

use roomkey_crypto::{EncryptedMessage, SenderKeyError, SessionKey, decrypt_with_session_key};

use crate::{error::CryptoError, session::SessionHandle, types::Algorithm};

/// Creates inbound sessions from shared keys and decrypts with them.
///
/// Implementations must be deterministic and must not mutate shared state in
/// `decrypt`; a session stays able to decrypt every index at or after its
/// first known index.
pub trait RatchetEngine: Send + Sync + 'static {
    /// Build inbound ratchet state from a textual session key.
    fn create_inbound_session(
        &self,
        session_key: &str,
        algorithm: Algorithm,
    ) -> Result<SessionHandle, CryptoError>;

    /// Decrypt `ciphertext` at ratchet `index`.
    fn decrypt(
        &self,
        session: &SessionHandle,
        ciphertext: &[u8],
        index: u32,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Whether stepping `earlier` forward reaches the state in `later`.
    ///
    /// A stored session is only replaced by an earlier-index key when this
    /// holds.
    fn connects(&self, earlier: &SessionHandle, later: &SessionHandle) -> Result<bool, CryptoError>;
}

/// [`RatchetEngine`] backed by the `roomkey-crypto` sender-key ratchet.
///
/// Session keys travel as hex of [`SessionKey::encode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SenderKeyEngine;

impl SenderKeyEngine {
    /// Create the engine.
    pub fn new() -> Self {
        Self
    }

    /// Text form of a session key, as carried in room key events.
    pub fn export_session_key(key: &SessionKey) -> String {
        hex::encode(key.encode())
    }
}

impl RatchetEngine for SenderKeyEngine {
    fn create_inbound_session(
        &self,
        session_key: &str,
        algorithm: Algorithm,
    ) -> Result<SessionHandle, CryptoError> {
        let bytes =
            hex::decode(session_key).map_err(|e| CryptoError::InvalidSessionKey(e.to_string()))?;
        let key = SessionKey::decode(&bytes).map_err(CryptoError::from)?;

        Ok(SessionHandle::new(algorithm, key.index(), key.encode()))
    }

    fn decrypt(
        &self,
        session: &SessionHandle,
        ciphertext: &[u8],
        index: u32,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = SessionKey::decode(session.state()).map_err(CryptoError::from)?;
        let message = EncryptedMessage::from_body(index, ciphertext).map_err(CryptoError::from)?;

        decrypt_with_session_key(&key, &message, b"").map_err(CryptoError::from)
    }

    fn connects(&self, earlier: &SessionHandle, later: &SessionHandle) -> Result<bool, CryptoError> {
        let earlier = SessionKey::decode(earlier.state()).map_err(CryptoError::from)?;
        let later = SessionKey::decode(later.state()).map_err(CryptoError::from)?;

        earlier.precedes(&later).map_err(CryptoError::from)
    }
}

impl From<SenderKeyError> for CryptoError {
    fn from(err: SenderKeyError) -> Self {
        match err {
            SenderKeyError::InvalidSessionKey { reason } => Self::InvalidSessionKey(reason),
            SenderKeyError::IndexUnavailable { first_known, requested } => {
                Self::IndexUnavailable { first_known, requested }
            },
            SenderKeyError::IndexTooFarAhead { current, requested } => {
                Self::IndexTooFarAhead { first_known: current, requested }
            },
            SenderKeyError::MalformedMessage { reason } => Self::Malformed(reason),
            SenderKeyError::DecryptionFailed { reason } => Self::AuthenticationFailed(reason),
            SenderKeyError::IndexOverflow { current } => {
                Self::Malformed(format!("ratchet index overflow at {current}"))
            },
        }
    }
}
