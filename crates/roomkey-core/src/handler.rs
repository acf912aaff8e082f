//! Room key event handling.
//!
//! Turns `m.room_key` and `m.forwarded_room_key` events into stored inbound
//! sessions. Input comes straight off the network, so every malformed event
//! is logged and dropped rather than surfaced as an error.
//!
//! The shared-history flag is taken from the event alone. Current room
//! visibility is never consulted here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    config::CoreConfig,
    engine::RatchetEngine,
    error::RoomKeyError,
    event::{RoomKeyEvent, ToDeviceEvent},
    locks::SessionLocks,
    session::{InboundGroupSession, SessionProvenance},
    store::{SessionStore, StoreError},
};

/// What happened to a room key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// A new session was stored
    Created,
    /// The stored session's key material was replaced by an earlier index
    Replaced {
        /// First known index before the import
        previous_index: u32,
        /// First known index after the import
        first_known_index: u32,
    },
    /// A session already existed and the event did not improve it
    KeptExisting,
    /// The event was invalid; nothing was stored
    Dropped(RoomKeyError),
}

impl ImportOutcome {
    /// Whether the store changed.
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Created | Self::Replaced { .. })
    }
}

/// Installs inbound sessions from room key events.
pub struct RoomKeyEventHandler<S: SessionStore, E: RatchetEngine> {
    store: S,
    engine: Arc<E>,
    config: CoreConfig,
    locks: SessionLocks,
}

impl<S: SessionStore, E: RatchetEngine> RoomKeyEventHandler<S, E> {
    /// Create a handler. `locks` must be shared with every reader of `store`.
    pub fn new(store: S, engine: Arc<E>, config: CoreConfig, locks: SessionLocks) -> Self {
        Self { store, engine, config, locks }
    }

    /// Handle a to-device event carrying a room key.
    ///
    /// Malformed events come back as [`ImportOutcome::Dropped`]. `Err` means
    /// the store failed; nothing was written and the event can be retried.
    pub fn on_room_key_event(&self, event: &ToDeviceEvent) -> Result<ImportOutcome, StoreError> {
        match RoomKeyEvent::parse(event) {
            Ok(parsed) => self.import(&parsed),
            Err(error) => {
                warn!(event_type = %event.event_type, %error, "dropping room key event");
                Ok(ImportOutcome::Dropped(error))
            },
        }
    }

    /// Install a validated room key.
    pub fn import(&self, event: &RoomKeyEvent) -> Result<ImportOutcome, StoreError> {
        let handle = match self.engine.create_inbound_session(&event.session_key, event.algorithm) {
            Ok(handle) => handle,
            Err(error) => {
                warn!(session_id = %event.session_id, %error, "rejecting room key session key");
                return Ok(ImportOutcome::Dropped(RoomKeyError::InvalidSessionKey(error)));
            },
        };

        let shared_history = event.shared_history.resolve(self.config.honor_shared_history_hints);

        let candidate = InboundGroupSession::new(
            event.session_id.clone(),
            event.sender_key.clone(),
            SessionProvenance {
                room_id: event.room_id.clone(),
                shared_history,
                forwarding_chain: event.forwarding_chain.clone(),
                sender_claimed_ed25519_key: event.sender_claimed_ed25519_key.clone(),
            },
            handle,
        );

        let key = candidate.key_id();
        let _guard = self.locks.write(&key);

        let Some(existing) = self.store.get(candidate.session_id(), candidate.sender_key())? else {
            self.store.put(&candidate)?;
            info!(
                session_id = %candidate.session_id(),
                sender_key = %candidate.sender_key(),
                room_id = %candidate.room_id(),
                shared_history,
                first_known_index = candidate.first_known_index(),
                "installed inbound group session"
            );
            return Ok(ImportOutcome::Created);
        };

        if existing.room_id() != candidate.room_id() {
            let error = RoomKeyError::RoomConflict {
                existing: existing.room_id().clone(),
                claimed: candidate.room_id().clone(),
            };
            warn!(session_id = %key.session_id, %error, "dropping room key event");
            return Ok(ImportOutcome::Dropped(error));
        }

        let Some(merged) = existing.improved_by(&candidate) else {
            debug!(
                session_id = %key.session_id,
                stored_index = existing.first_known_index(),
                offered_index = candidate.first_known_index(),
                "keeping existing inbound group session"
            );
            return Ok(ImportOutcome::KeptExisting);
        };

        let dropped = match self.engine.connects(candidate.handle(), existing.handle()) {
            Ok(true) => None,
            Ok(false) => Some(RoomKeyError::DisconnectedRatchet {
                stored_index: existing.first_known_index(),
                offered_index: candidate.first_known_index(),
            }),
            Err(error) => Some(RoomKeyError::InvalidSessionKey(error)),
        };
        if let Some(error) = dropped {
            warn!(session_id = %key.session_id, %error, "dropping room key event");
            return Ok(ImportOutcome::Dropped(error));
        }

        self.store.put(&merged)?;
        info!(
            session_id = %key.session_id,
            previous_index = existing.first_known_index(),
            first_known_index = merged.first_known_index(),
            "replaced inbound group session with earlier index"
        );
        Ok(ImportOutcome::Replaced {
            previous_index: existing.first_known_index(),
            first_known_index: merged.first_known_index(),
        })
    }
}
