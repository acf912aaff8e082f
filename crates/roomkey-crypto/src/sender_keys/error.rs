//! Error types for sender key operations

use thiserror::Error;

/// Errors from sender key operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SenderKeyError {
    /// Exported session key could not be decoded
    #[error("invalid session key: {reason}")]
    InvalidSessionKey {
        /// Why decoding failed
        reason: String,
    },

    /// Message index is older than the first index the key can derive
    #[error("ratchet index {requested} unavailable: first known index is {first_known}")]
    IndexUnavailable {
        /// First index the session key can produce
        first_known: u32,
        /// Index the message was encrypted at
        requested: u32,
    },

    /// Message index is further ahead than we are willing to ratchet
    #[error("ratchet too far behind: at index {current}, need {requested}")]
    IndexTooFarAhead {
        /// Current ratchet index
        current: u32,
        /// Requested index
        requested: u32,
    },

    /// Decryption failed (authentication tag mismatch)
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },

    /// Encrypted message bytes are not framed correctly
    #[error("malformed message: {reason}")]
    MalformedMessage {
        /// What was wrong with the framing
        reason: String,
    },

    /// Ratchet index would overflow
    #[error("ratchet index overflow at {current}")]
    IndexOverflow {
        /// Current index when overflow was detected
        current: u32,
    },
}

impl SenderKeyError {
    /// Returns true if this error is fatal for the message that caused it.
    ///
    /// Non-fatal errors can be resolved by obtaining a better session key.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidSessionKey { .. }
            | Self::DecryptionFailed { .. }
            | Self::MalformedMessage { .. }
            | Self::IndexOverflow { .. } => true,

            Self::IndexUnavailable { .. } | Self::IndexTooFarAhead { .. } => false,
        }
    }
}
