//! Error types for the roomkey core.
//!
//! One enum per layer: the ratchet engine boundary ([`CryptoError`]), room
//! key input validation ([`RoomKeyError`]) and decryption
//! ([`DecryptionError`]). Storage errors live in [`crate::store`].

use thiserror::Error;

use crate::{
    store::StoreError,
    types::{Curve25519Key, RoomId, SessionId},
};

/// Errors reported by a [`crate::RatchetEngine`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Session key material could not be decoded
    #[error("invalid session key: {0}")]
    InvalidSessionKey(String),

    /// The session cannot derive the requested ratchet index
    #[error("ratchet index {requested} unavailable (first known {first_known})")]
    IndexUnavailable {
        /// First index the session can decrypt
        first_known: u32,
        /// Index the message was encrypted at
        requested: u32,
    },

    /// The requested index is further past the session start than the
    /// engine will derive
    #[error("ratchet index {requested} too far past first known {first_known}")]
    IndexTooFarAhead {
        /// First index the session can decrypt
        first_known: u32,
        /// Index the message was encrypted at
        requested: u32,
    },

    /// Ciphertext is not framed the way the engine expects
    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    /// Authentication tag did not verify
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
}

/// Reasons a room key event was dropped without installing a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomKeyError {
    /// Event type is not a room key event
    #[error("unexpected event type {0}")]
    UnexpectedEventType(String),

    /// A required field is absent or empty
    #[error("missing required field {0}")]
    MissingField(&'static str),

    /// Content could not be deserialized
    #[error("malformed content: {0}")]
    MalformedContent(String),

    /// Algorithm identifier is not supported
    #[error("unrecognized algorithm {0}")]
    UnknownAlgorithm(String),

    /// The engine rejected the session key
    #[error("session key rejected: {0}")]
    InvalidSessionKey(#[from] CryptoError),

    /// An existing session for this key belongs to a different room
    #[error("session already bound to room {existing}, event names {claimed}")]
    RoomConflict {
        /// Room of the stored session
        existing: RoomId,
        /// Room named by the rejected event
        claimed: RoomId,
    },

    /// An earlier-index key for a stored session does not lead to the
    /// stored ratchet state
    #[error("session key at index {offered_index} does not precede stored index {stored_index}")]
    DisconnectedRatchet {
        /// First index of the stored session
        stored_index: u32,
        /// First index of the rejected key
        offered_index: u32,
    },
}

/// How a caller should react to a [`DecryptionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Request the key from other devices, then retry
    AfterKeyRequest,
    /// Only a fresh share with an earlier index can help
    AfterNewKeyShare,
    /// Transient failure, retry the same event later
    Later,
    /// Permanent for this event
    Never,
}

/// Errors from decrypting a group-encrypted event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    /// No inbound session for (session id, sender key)
    #[error("no inbound session {session_id} from {sender_key}")]
    SessionNotFound {
        /// Session named by the event
        session_id: SessionId,
        /// Sender key named by the event
        sender_key: Curve25519Key,
    },

    /// The session was created for another room
    #[error("session belongs to room {session_room}, event is in {event_room}")]
    RoomMismatch {
        /// Room recorded on the session
        session_room: RoomId,
        /// Room the event was received in
        event_room: RoomId,
    },

    /// The session cannot decrypt the message's ratchet index
    #[error("ratchet index {requested} unavailable (first known {first_known})")]
    RatchetIndexUnavailable {
        /// First index the session can decrypt
        first_known: u32,
        /// Index the message was encrypted at
        requested: u32,
    },

    /// The message index is beyond the ratchet skip limit from the
    /// session's first known index
    #[error("ratchet index {requested} too far past first known {first_known}")]
    IndexTooFarAhead {
        /// First index the session can decrypt
        first_known: u32,
        /// Index the message was encrypted at
        requested: u32,
    },

    /// Ciphertext could not be parsed
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Event algorithm differs from the session's algorithm
    #[error("algorithm mismatch: session uses {expected}, event declares {actual}")]
    AlgorithmMismatch {
        /// Algorithm the session was built for
        expected: String,
        /// Algorithm the event declares
        actual: String,
    },

    /// Authentication failed
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Another event already decrypted at this ratchet index
    #[error("message index {index} already used by event {first_event_id}")]
    ReplayedMessageIndex {
        /// Reused index
        index: u32,
        /// Event that first decrypted at this index
        first_event_id: String,
    },

    /// Session store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DecryptionError {
    /// Retry guidance for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::SessionNotFound { .. } => RetryPolicy::AfterKeyRequest,
            Self::RatchetIndexUnavailable { .. } => RetryPolicy::AfterNewKeyShare,
            Self::Store(_) => RetryPolicy::Later,
            Self::RoomMismatch { .. }
            | Self::IndexTooFarAhead { .. }
            | Self::MalformedCiphertext(_)
            | Self::AlgorithmMismatch { .. }
            | Self::DecryptionFailed(_)
            | Self::ReplayedMessageIndex { .. } => RetryPolicy::Never,
        }
    }

    /// Returns true if waiting for more keys may let this event decrypt.
    pub fn is_retryable(&self) -> bool {
        self.retry_policy() != RetryPolicy::Never
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_session_asks_for_keys() {
        let err = DecryptionError::SessionNotFound {
            session_id: "s".into(),
            sender_key: "k".into(),
        };
        assert_eq!(err.retry_policy(), RetryPolicy::AfterKeyRequest);
        assert!(err.is_retryable());
    }

    #[test]
    fn unavailable_index_needs_new_share() {
        let err = DecryptionError::RatchetIndexUnavailable { first_known: 3, requested: 1 };
        assert_eq!(err.retry_policy(), RetryPolicy::AfterNewKeyShare);
    }

    #[test]
    fn malformed_and_mismatched_are_permanent() {
        assert_eq!(
            DecryptionError::MalformedCiphertext("short".into()).retry_policy(),
            RetryPolicy::Never
        );
        assert!(
            !DecryptionError::AlgorithmMismatch { expected: "a".into(), actual: "b".into() }
                .is_retryable()
        );
        assert!(!DecryptionError::DecryptionFailed("bad mac".into()).is_retryable());
    }

    #[test]
    fn index_past_skip_limit_is_permanent() {
        let err = DecryptionError::IndexTooFarAhead { first_known: 0, requested: 10_001 };
        assert_eq!(err.retry_policy(), RetryPolicy::Never);
    }

    #[test]
    fn store_failures_retry_later() {
        let err = DecryptionError::from(StoreError::Io("disk".into()));
        assert_eq!(err.retry_policy(), RetryPolicy::Later);
    }
}
