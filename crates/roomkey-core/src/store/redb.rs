//! Redb-backed durable session store.
//!
//! Uses Redb's ACID transactions so a `put` is all-or-nothing across
//! restarts.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTableMetadata, TableDefinition};

use super::{SessionStore, StoreError};
use crate::{
    session::InboundGroupSession,
    types::{Curve25519Key, SessionId},
};

/// Table: inbound_group_sessions
/// Key: session_id length (u32 BE) || session_id || sender_key
/// Value: CBOR-encoded InboundGroupSession
const SESSIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("inbound_group_sessions");

/// Durable session store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbSessionStore {
    db: Arc<Database>,
}

impl RedbSessionStore {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(SESSIONS).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Number of stored sessions.
    pub fn len(&self) -> Result<u64, StoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(SESSIONS).map_err(io)?;
        table.len().map_err(io)
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl SessionStore for RedbSessionStore {
    fn get(
        &self,
        session_id: &SessionId,
        sender_key: &Curve25519Key,
    ) -> Result<Option<InboundGroupSession>, StoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(SESSIONS).map_err(io)?;

        let key = encode_session_key(session_id, sender_key);
        let Some(value) = table.get(key.as_slice()).map_err(io)? else {
            return Ok(None);
        };

        let session: InboundGroupSession = ciborium::from_reader(value.value())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(session))
    }

    fn put(&self, session: &InboundGroupSession) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(session, &mut bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(SESSIONS).map_err(io)?;
            let key = encode_session_key(session.session_id(), session.sender_key());
            table.insert(key.as_slice(), bytes.as_slice()).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }
}

fn io(err: impl std::fmt::Display) -> StoreError {
    StoreError::Io(err.to_string())
}

/// Length-prefix the session id so ("ab", "c") and ("a", "bc") never collide.
fn encode_session_key(session_id: &SessionId, sender_key: &Curve25519Key) -> Vec<u8> {
    let session_id = session_id.as_str().as_bytes();
    let sender_key = sender_key.as_str().as_bytes();

    let mut key = Vec::with_capacity(4 + session_id.len() + sender_key.len());
    key.extend_from_slice(&(session_id.len() as u32).to_be_bytes());
    key.extend_from_slice(session_id);
    key.extend_from_slice(sender_key);
    key
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::{
        session::{SessionHandle, SessionProvenance},
        types::Algorithm,
    };

    fn session(session_id: &str, sender_key: &str, shared_history: bool) -> InboundGroupSession {
        InboundGroupSession::new(
            session_id.into(),
            sender_key.into(),
            SessionProvenance {
                room_id: "!room".into(),
                shared_history,
                forwarding_chain: vec!["hop".into()],
                sender_claimed_ed25519_key: Some("ed".to_owned()),
            },
            SessionHandle::new(Algorithm::MegolmV1, 4, vec![9; 37]),
        )
    }

    #[test]
    fn sessions_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.redb");
        let stored = session("s1", "k1", true);

        {
            let store = RedbSessionStore::open(&path).unwrap();
            store.put(&stored).unwrap();
        }

        let store = RedbSessionStore::open(&path).unwrap();
        assert_eq!(store.get(&"s1".into(), &"k1".into()).unwrap(), Some(stored));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn composite_key_does_not_collide() {
        let dir = tempdir().unwrap();
        let store = RedbSessionStore::open(dir.path().join("sessions.redb")).unwrap();

        store.put(&session("ab", "c", false)).unwrap();
        store.put(&session("a", "bc", true)).unwrap();

        assert_eq!(store.len().unwrap(), 2);
        assert!(!store.get(&"ab".into(), &"c".into()).unwrap().unwrap().shared_history());
        assert!(store.get(&"a".into(), &"bc".into()).unwrap().unwrap().shared_history());
    }

    #[test]
    fn put_replaces_existing_value() {
        let dir = tempdir().unwrap();
        let store = RedbSessionStore::open(dir.path().join("sessions.redb")).unwrap();

        store.put(&session("s1", "k1", false)).unwrap();
        store.put(&session("s1", "k1", true)).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        assert!(store.get(&"s1".into(), &"k1".into()).unwrap().unwrap().shared_history());
    }
}
