//! Wiring of handler, resolver and dispatcher onto one store.

use std::sync::Arc;

use crate::{
    config::CoreConfig,
    dispatcher::{DecryptedEvent, DecryptionDispatcher},
    engine::RatchetEngine,
    error::DecryptionError,
    event::{EncryptedEvent, ToDeviceEvent},
    handler::{ImportOutcome, RoomKeyEventHandler},
    locks::SessionLocks,
    resolver::SharedHistoryResolver,
    store::{SessionStore, StoreError},
    types::{Curve25519Key, RoomId, SessionId},
};

/// Inbound group session manager.
///
/// All three components share the same store, engine and lock table, so
/// imports and reads of one session key are ordered with respect to each
/// other.
pub struct GroupSessions<S: SessionStore, E: RatchetEngine> {
    handler: RoomKeyEventHandler<S, E>,
    resolver: SharedHistoryResolver<S>,
    dispatcher: DecryptionDispatcher<S, E>,
}

impl<S: SessionStore, E: RatchetEngine> GroupSessions<S, E> {
    /// Build the manager.
    pub fn new(store: S, engine: E, config: CoreConfig) -> Self {
        let engine = Arc::new(engine);
        let locks = SessionLocks::new(config.lock_shards);

        Self {
            handler: RoomKeyEventHandler::new(
                store.clone(),
                Arc::clone(&engine),
                config,
                locks.clone(),
            ),
            resolver: SharedHistoryResolver::new(store.clone(), locks.clone()),
            dispatcher: DecryptionDispatcher::with_config(store, engine, locks, &config),
        }
    }

    /// See [`RoomKeyEventHandler::on_room_key_event`].
    pub fn on_room_key_event(&self, event: &ToDeviceEvent) -> Result<ImportOutcome, StoreError> {
        self.handler.on_room_key_event(event)
    }

    /// See [`SharedHistoryResolver::has_shared_history`].
    pub fn has_shared_history(
        &self,
        room_id: &RoomId,
        session_id: &SessionId,
        sender_key: &Curve25519Key,
    ) -> Result<bool, StoreError> {
        self.resolver.has_shared_history(room_id, session_id, sender_key)
    }

    /// See [`DecryptionDispatcher::decrypt`].
    pub fn decrypt(&self, event: &EncryptedEvent) -> Result<DecryptedEvent, DecryptionError> {
        self.dispatcher.decrypt(event)
    }

    /// The room key handler.
    pub fn handler(&self) -> &RoomKeyEventHandler<S, E> {
        &self.handler
    }

    /// The shared-history resolver.
    pub fn resolver(&self) -> &SharedHistoryResolver<S> {
        &self.resolver
    }

    /// The decryption dispatcher.
    pub fn dispatcher(&self) -> &DecryptionDispatcher<S, E> {
        &self.dispatcher
    }
}
