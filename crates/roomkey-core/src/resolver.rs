//! Shared-history queries.

use crate::{
    locks::SessionLocks,
    room_state::{HistoryVisibility, RoomStateProvider},
    store::{SessionStore, StoreError},
    types::{Curve25519Key, RoomId, SessionId, SessionKeyId},
};

/// Shared-history status of a session next to the room's current
/// visibility, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryDisplay {
    /// Result of [`SharedHistoryResolver::has_shared_history`]
    pub shared_history: bool,
    /// Room visibility right now, which may differ from share time
    pub current_visibility: HistoryVisibility,
}

/// Answers whether a session counts as shared-history key material.
#[derive(Clone)]
pub struct SharedHistoryResolver<S: SessionStore> {
    store: S,
    locks: SessionLocks,
}

impl<S: SessionStore> SharedHistoryResolver<S> {
    /// Create a resolver reading `store`.
    pub fn new(store: S, locks: SessionLocks) -> Self {
        Self { store, locks }
    }

    /// `true` only if a session exists for (session id, sender key), was
    /// created for `room_id`, and carries the shared-history flag.
    pub fn has_shared_history(
        &self,
        room_id: &RoomId,
        session_id: &SessionId,
        sender_key: &Curve25519Key,
    ) -> Result<bool, StoreError> {
        let key = SessionKeyId::new(session_id.clone(), sender_key.clone());
        let _guard = self.locks.read(&key);

        Ok(self
            .store
            .get(session_id, sender_key)?
            .is_some_and(|session| session.room_id() == room_id && session.shared_history()))
    }

    /// [`has_shared_history`](Self::has_shared_history) plus the room's
    /// current visibility. The visibility is reported, never used to decide.
    pub fn history_display(
        &self,
        room_state: &impl RoomStateProvider,
        room_id: &RoomId,
        session_id: &SessionId,
        sender_key: &Curve25519Key,
    ) -> Result<HistoryDisplay, StoreError> {
        Ok(HistoryDisplay {
            shared_history: self.has_shared_history(room_id, session_id, sender_key)?,
            current_visibility: room_state.history_visibility(room_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        room_state::StaticRoomState,
        session::{InboundGroupSession, SessionHandle, SessionProvenance},
        store::MemorySessionStore,
        types::Algorithm,
    };

    fn store_with(room: &str, shared_history: bool) -> MemorySessionStore {
        let store = MemorySessionStore::new();
        store
            .put(&InboundGroupSession::new(
                "session".into(),
                "sender".into(),
                SessionProvenance {
                    room_id: room.into(),
                    shared_history,
                    forwarding_chain: Vec::new(),
                    sender_claimed_ed25519_key: None,
                },
                SessionHandle::new(Algorithm::MegolmV1, 0, Vec::new()),
            ))
            .unwrap();
        store
    }

    fn query(store: MemorySessionStore, room: &str, session: &str) -> bool {
        SharedHistoryResolver::new(store, SessionLocks::new(1))
            .has_shared_history(&room.into(), &session.into(), &"sender".into())
            .unwrap()
    }

    #[test]
    fn missing_session_is_not_shared() {
        assert!(!query(MemorySessionStore::new(), "!room", "session"));
    }

    #[test]
    fn room_must_match() {
        assert!(!query(store_with("!other", true), "!room", "session"));
    }

    #[test]
    fn flag_must_be_set() {
        assert!(!query(store_with("!room", false), "!room", "session"));
        assert!(query(store_with("!room", true), "!room", "session"));
    }

    #[test]
    fn display_reports_visibility_without_changing_flag() {
        let resolver = SharedHistoryResolver::new(store_with("!room", false), SessionLocks::new(1));
        let room_state =
            StaticRoomState::new().with_room("!room".into(), HistoryVisibility::WorldReadable);

        let display = resolver
            .history_display(&room_state, &"!room".into(), &"session".into(), &"sender".into())
            .unwrap();

        assert_eq!(display, HistoryDisplay {
            shared_history: false,
            current_visibility: HistoryVisibility::WorldReadable,
        });
    }
}
