//! Session store abstraction
//!
//! Durable map from (session id, sender key) to [`InboundGroupSession`]. The
//! trait is synchronous; callers on latency-sensitive paths should move
//! store calls onto a blocking pool.

mod chaotic;
mod error;
mod memory;
mod redb;

pub use chaotic::ChaoticSessionStore;
pub use error::StoreError;
pub use memory::MemorySessionStore;

pub use self::redb::RedbSessionStore;
use crate::{
    session::InboundGroupSession,
    types::{Curve25519Key, SessionId},
};

/// Storage for inbound group sessions.
///
/// Must be Clone (shared by handler, resolver and dispatcher) and thread-safe.
/// Implementations typically share internal state via Arc, so clones access
/// the same underlying storage.
pub trait SessionStore: Clone + Send + Sync + 'static {
    /// Look up the session for (session id, sender key).
    fn get(
        &self,
        session_id: &SessionId,
        sender_key: &Curve25519Key,
    ) -> Result<Option<InboundGroupSession>, StoreError>;

    /// Insert or replace the session under its own key.
    ///
    /// # Invariants
    ///
    /// - Atomic: readers see either the previous value or the whole new one
    fn put(&self, session: &InboundGroupSession) -> Result<(), StoreError>;
}
