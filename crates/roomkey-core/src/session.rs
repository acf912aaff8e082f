//! Inbound group sessions.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::types::{Algorithm, Curve25519Key, RoomId, SessionId, SessionKeyId};

/// Ratchet state owned by a [`crate::RatchetEngine`].
///
/// The core never looks inside `state`; it only reads the algorithm and the
/// first index the engine says the state can decrypt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    algorithm: Algorithm,
    first_known_index: u32,
    state: Vec<u8>,
}

impl SessionHandle {
    /// Wrap engine-defined state.
    pub fn new(algorithm: Algorithm, first_known_index: u32, state: Vec<u8>) -> Self {
        Self { algorithm, first_known_index, state }
    }

    /// Algorithm the state was created for.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Earliest ratchet index this state can decrypt.
    pub fn first_known_index(&self) -> u32 {
        self.first_known_index
    }

    /// Engine-defined bytes.
    pub fn state(&self) -> &[u8] {
        &self.state
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("algorithm", &self.algorithm)
            .field("first_known_index", &self.first_known_index)
            .finish_non_exhaustive()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.state.zeroize();
    }
}

/// Where a session's key came from, fixed when the session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProvenance {
    /// Room the key was shared for
    pub room_id: RoomId,
    /// Sender allowed the key to be re-shared with later joiners
    pub shared_history: bool,
    /// Devices that re-forwarded the key, oldest first
    pub forwarding_chain: Vec<Curve25519Key>,
    /// Signing key the sender claimed in the key event
    pub sender_claimed_ed25519_key: Option<String>,
}

/// Receiving half of a group session, keyed by (session id, sender key).
///
/// # Invariants
///
/// - `room_id` and `shared_history` come from the key event that created the
///   session and are never recomputed from room state
/// - Fields are private; a session is only ever built whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundGroupSession {
    session_id: SessionId,
    sender_key: Curve25519Key,
    provenance: SessionProvenance,
    handle: SessionHandle,
}

impl InboundGroupSession {
    /// Assemble a session from its identity, provenance and ratchet state.
    pub fn new(
        session_id: SessionId,
        sender_key: Curve25519Key,
        provenance: SessionProvenance,
        handle: SessionHandle,
    ) -> Self {
        Self { session_id, sender_key, provenance, handle }
    }

    /// Session identifier.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Curve25519 key of the device that created the session.
    pub fn sender_key(&self) -> &Curve25519Key {
        &self.sender_key
    }

    /// Storage key.
    pub fn key_id(&self) -> SessionKeyId {
        SessionKeyId::new(self.session_id.clone(), self.sender_key.clone())
    }

    /// Room the session was shared for.
    pub fn room_id(&self) -> &RoomId {
        &self.provenance.room_id
    }

    /// Whether the sender flagged the key as shareable history.
    pub fn shared_history(&self) -> bool {
        self.provenance.shared_history
    }

    /// Devices that re-forwarded this key. Empty for direct shares.
    pub fn forwarding_chain(&self) -> &[Curve25519Key] {
        &self.provenance.forwarding_chain
    }

    /// Claimed ed25519 signing key of the sender, if any.
    pub fn sender_claimed_ed25519_key(&self) -> Option<&str> {
        self.provenance.sender_claimed_ed25519_key.as_deref()
    }

    /// Full provenance record.
    pub fn provenance(&self) -> &SessionProvenance {
        &self.provenance
    }

    /// Ratchet state.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Algorithm the session was built for.
    pub fn algorithm(&self) -> Algorithm {
        self.handle.algorithm()
    }

    /// Earliest ratchet index this session can decrypt.
    pub fn first_known_index(&self) -> u32 {
        self.handle.first_known_index()
    }

    /// Take better key material from `candidate` while keeping this
    /// session's room and shared-history flag.
    ///
    /// Returns `None` unless `candidate` is for the same room and algorithm
    /// and starts at a strictly earlier ratchet index.
    pub fn improved_by(&self, candidate: &Self) -> Option<Self> {
        if candidate.room_id() != self.room_id()
            || candidate.algorithm() != self.algorithm()
            || candidate.first_known_index() >= self.first_known_index()
        {
            return None;
        }

        Some(Self {
            session_id: self.session_id.clone(),
            sender_key: self.sender_key.clone(),
            provenance: SessionProvenance {
                room_id: self.provenance.room_id.clone(),
                shared_history: self.provenance.shared_history,
                forwarding_chain: candidate.provenance.forwarding_chain.clone(),
                sender_claimed_ed25519_key: candidate
                    .provenance
                    .sender_claimed_ed25519_key
                    .clone()
                    .or_else(|| self.provenance.sender_claimed_ed25519_key.clone()),
            },
            handle: candidate.handle.clone(),
        })
    }
}
