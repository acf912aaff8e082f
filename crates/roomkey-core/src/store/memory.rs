#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{SessionStore, StoreError};
use crate::{
    session::InboundGroupSession,
    types::{Curve25519Key, SessionId, SessionKeyId},
};

/// In-memory session store for tests and ephemeral clients
///
/// All state sits behind `Arc<Mutex<>>` so clones share one map.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<HashMap<SessionKeyId, InboundGroupSession>>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionKeyId, InboundGroupSession>>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Io("session map lock poisoned".to_owned()))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(
        &self,
        session_id: &SessionId,
        sender_key: &Curve25519Key,
    ) -> Result<Option<InboundGroupSession>, StoreError> {
        let key = SessionKeyId::new(session_id.clone(), sender_key.clone());
        Ok(self.lock()?.get(&key).cloned())
    }

    fn put(&self, session: &InboundGroupSession) -> Result<(), StoreError> {
        self.lock()?.insert(session.key_id(), session.clone());
        Ok(())
    }
}
