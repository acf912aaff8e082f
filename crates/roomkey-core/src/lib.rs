//! Roomkey Core
//!
//! Inbound group sessions for group-encrypted rooms: importing keys from
//! key-distribution events, answering shared-history queries, and
//! decrypting events.
//!
//! # Architecture
//!
//! ```text
//! m.room_key / m.forwarded_room_key
//!        │
//!        ▼
//! RoomKeyEventHandler ──create──► RatchetEngine
//!        │
//!        ▼ put (serialized per session key)
//! SessionStore ◄──get── SharedHistoryResolver
//!        ▲
//!        │ get
//! DecryptionDispatcher ──decrypt──► RatchetEngine
//!        ▲
//!        │
//! encrypted room event
//! ```
//!
//! # Components
//!
//! - [`RoomKeyEventHandler`]: validates key events and installs sessions
//! - [`SharedHistoryResolver`]: `has_shared_history(room, session, sender)`
//! - [`DecryptionDispatcher`]: decrypts events, reporting typed failures
//! - [`GroupSessions`]: all three wired onto one store and lock table
//! - [`SessionStore`]: storage trait with memory, redb and chaotic backends
//! - [`RatchetEngine`]: ratchet boundary, backed by [`SenderKeyEngine`]
//!
//! # Shared History
//!
//! A session's `shared_history` flag is taken from the key event that
//! created it, defaulting to `false` when the event carries none, and only
//! honored when [`CoreConfig::honor_shared_history_hints`] is set. Room
//! history visibility never feeds into it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod event;
pub mod handler;
pub mod locks;
mod replay;
pub mod resolver;
pub mod room_state;
pub mod session;
mod sessions;
pub mod store;
pub mod types;

pub use config::CoreConfig;
pub use dispatcher::{DecryptedEvent, DecryptionDispatcher};
pub use engine::{RatchetEngine, SenderKeyEngine};
pub use error::{CryptoError, DecryptionError, RetryPolicy, RoomKeyError};
pub use event::{
    CiphertextEnvelope, EncryptedEvent, FORWARDED_ROOM_KEY_EVENT_TYPE, ROOM_KEY_EVENT_TYPE,
    RoomKeyEvent, ToDeviceEvent,
};
pub use handler::{ImportOutcome, RoomKeyEventHandler};
pub use locks::SessionLocks;
pub use resolver::{HistoryDisplay, SharedHistoryResolver};
pub use room_state::{HistoryVisibility, RoomStateProvider, StaticRoomState};
pub use session::{InboundGroupSession, SessionHandle, SessionProvenance};
pub use sessions::GroupSessions;
pub use store::{
    ChaoticSessionStore, MemorySessionStore, RedbSessionStore, SessionStore, StoreError,
};
pub use types::{Algorithm, Curve25519Key, RoomId, SessionId, SessionKeyId, SharedHistoryHint};
