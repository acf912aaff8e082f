//! Sender keys: one-way ratchets fanned out to every room member
//!
//! A single sender owns the outbound side of a session. Recipients hold an
//! inbound copy that starts wherever the sender exported it.
//!
//! # Architecture
//!
//! ```text
//! OutboundSession
//!        │
//!        ▼ export
//! SessionKey { index, chain_key }
//!        │
//!        ▼ advance_to(message index)
//! MessageKey[index]
//!        │
//!        ▼ decrypt
//! Plaintext
//! ```

pub mod encryption;
pub mod error;
pub mod ratchet;
pub mod session;

pub use encryption::{EncryptedMessage, NONCE_RANDOM_SIZE, decrypt_message, encrypt_message};
pub use error::SenderKeyError;
pub use ratchet::{MAX_SKIP, MessageKey, SymmetricRatchet};
pub use session::{OutboundSession, SessionKey, decrypt_with_session_key};
