//! Roomkey Cryptographic Primitives
//!
//! The ratchet that sits underneath roomkey group sessions. Pure functions
//! with deterministic outputs; callers provide random bytes so tests stay
//! reproducible.
//!
//! # Key Lifecycle
//!
//! A sender picks a random 32-byte seed and starts an [`OutboundSession`].
//! Every message advances a symmetric ratchet and is sealed with a one-time
//! message key. The sender exports a [`SessionKey`] (ratchet index plus chain
//! key at that index) and fans it out to recipients, who can decrypt any
//! message at or after that index but nothing before it.
//!
//! ```text
//! Random Seed
//!        │
//!        ▼
//! Symmetric Ratchet ──export──► SessionKey (index i, chain key i)
//!        │                            │
//!        ▼                            ▼
//! Message Keys               Inbound decrypt for index >= i
//!        │
//!        ▼
//! AEAD Encryption → Ciphertext
//! ```
//!
//! # Security
//!
//! Forward Secrecy:
//! - Ratchet advancement: Old chain keys are zeroized after deriving next key
//! - Message key disposal: Keys are zeroized on drop
//! - A session key at index `i` reveals nothing about indices below `i`
//!
//! Authenticity:
//! - XChaCha20-Poly1305 AEAD provides tamper-proof encryption
//! - Nonce prefix binds the message to its ratchet index
//! - Failed authentication tag -> reject message

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod sender_keys;

pub use sender_keys::{
    EncryptedMessage, MAX_SKIP, MessageKey, NONCE_RANDOM_SIZE, OutboundSession, SenderKeyError, SessionKey,
    SymmetricRatchet, decrypt_message, decrypt_with_session_key, encrypt_message,
};
