//! Decryption of group-encrypted events.

#![allow(clippy::disallowed_types, reason = "Replay table is synchronous in-memory state")]

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::{
    engine::RatchetEngine,
    error::{CryptoError, DecryptionError},
    event::{CiphertextEnvelope, EncryptedEvent},
    config::CoreConfig,
    locks::SessionLocks,
    replay::ReplayTable,
    session::InboundGroupSession,
    store::{SessionStore, StoreError},
    types::{Curve25519Key, SessionKeyId},
};

/// A decrypted event with the provenance of the key that opened it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedEvent {
    /// Clear content bytes
    pub plaintext: Vec<u8>,
    /// Curve25519 key of the session creator
    pub sender_key: Curve25519Key,
    /// Devices the key was forwarded through
    pub forwarding_chain: Vec<Curve25519Key>,
    /// Whether the key was shared as room history
    pub shared_history: bool,
    /// Claimed ed25519 key of the session creator
    pub sender_claimed_ed25519_key: Option<String>,
    /// Ratchet index the message was encrypted at
    pub message_index: u32,
}

impl DecryptedEvent {
    /// Clear content parsed as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.plaintext)
    }

    /// The key reached us through at least one re-forward.
    pub fn is_forwarded(&self) -> bool {
        !self.forwarding_chain.is_empty()
    }
}

/// Resolves sessions for encrypted events and decrypts them.
pub struct DecryptionDispatcher<S: SessionStore, E: RatchetEngine> {
    store: S,
    engine: Arc<E>,
    locks: SessionLocks,
    replay: Mutex<ReplayTable>,
}

impl<S: SessionStore, E: RatchetEngine> DecryptionDispatcher<S, E> {
    /// Create a dispatcher with default replay limits. `locks` must be the
    /// table the handler uses.
    pub fn new(store: S, engine: Arc<E>, locks: SessionLocks) -> Self {
        Self::with_config(store, engine, locks, &CoreConfig::default())
    }

    /// Create a dispatcher with the replay limits from `config`.
    pub fn with_config(store: S, engine: Arc<E>, locks: SessionLocks, config: &CoreConfig) -> Self {
        let replay = ReplayTable::new(config.replay_sessions, config.replay_window);
        Self { store, engine, locks, replay: Mutex::new(replay) }
    }

    /// Decrypt `event`.
    ///
    /// Nothing in the store changes, whatever the outcome.
    pub fn decrypt(&self, event: &EncryptedEvent) -> Result<DecryptedEvent, DecryptionError> {
        let result = self.try_decrypt(event);
        match &result {
            Ok(decrypted) => debug!(
                session_id = %event.session_id,
                message_index = decrypted.message_index,
                "decrypted group event"
            ),
            Err(error) if error.is_retryable() => debug!(
                session_id = %event.session_id,
                retry = ?error.retry_policy(),
                %error,
                "group event not decryptable yet"
            ),
            Err(error) => warn!(
                session_id = %event.session_id,
                room_id = %event.room_id,
                %error,
                "failed to decrypt group event"
            ),
        }
        result
    }

    fn try_decrypt(&self, event: &EncryptedEvent) -> Result<DecryptedEvent, DecryptionError> {
        let envelope = CiphertextEnvelope::parse(&event.ciphertext)?;
        let session = self.lookup(event)?;

        if session.room_id() != &event.room_id {
            return Err(DecryptionError::RoomMismatch {
                session_room: session.room_id().clone(),
                event_room: event.room_id.clone(),
            });
        }

        if session.algorithm().as_str() != event.algorithm {
            return Err(DecryptionError::AlgorithmMismatch {
                expected: session.algorithm().to_string(),
                actual: event.algorithm.clone(),
            });
        }

        let plaintext = self
            .engine
            .decrypt(session.handle(), &envelope.body, envelope.index)
            .map_err(|error| match error {
                CryptoError::IndexUnavailable { first_known, requested } => {
                    DecryptionError::RatchetIndexUnavailable { first_known, requested }
                },
                CryptoError::IndexTooFarAhead { first_known, requested } => {
                    DecryptionError::IndexTooFarAhead { first_known, requested }
                },
                CryptoError::Malformed(reason) | CryptoError::InvalidSessionKey(reason) => {
                    DecryptionError::MalformedCiphertext(reason)
                },
                CryptoError::AuthenticationFailed(reason) => {
                    DecryptionError::DecryptionFailed(reason)
                },
            })?;

        if let Some(event_id) = &event.event_id {
            self.check_replay(session.key_id(), envelope.index, event_id)?;
        }

        Ok(DecryptedEvent {
            plaintext,
            sender_key: session.sender_key().clone(),
            forwarding_chain: session.forwarding_chain().to_vec(),
            shared_history: session.shared_history(),
            sender_claimed_ed25519_key: session.sender_claimed_ed25519_key().map(str::to_owned),
            message_index: envelope.index,
        })
    }

    fn lookup(&self, event: &EncryptedEvent) -> Result<InboundGroupSession, DecryptionError> {
        let key = event.key_id();
        let _guard = self.locks.read(&key);

        self.store.get(&event.session_id, &event.sender_key)?.ok_or_else(|| {
            DecryptionError::SessionNotFound {
                session_id: event.session_id.clone(),
                sender_key: event.sender_key.clone(),
            }
        })
    }

    /// Reject a second event id decrypting at an index already used.
    fn check_replay(
        &self,
        key: SessionKeyId,
        index: u32,
        event_id: &str,
    ) -> Result<(), DecryptionError> {
        let mut replay =
            self.replay.lock().map_err(|_| StoreError::Io("replay table lock poisoned".to_owned()))?;

        match replay.record(&key, index, event_id) {
            Some(first_event_id) => {
                Err(DecryptionError::ReplayedMessageIndex { index, first_event_id })
            },
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use roomkey_crypto::{NONCE_RANDOM_SIZE, OutboundSession};

    use super::*;
    use crate::{
        engine::SenderKeyEngine,
        session::SessionProvenance,
        store::MemorySessionStore,
        types::{Algorithm, RoomId},
    };

    struct Fixture {
        outbound: OutboundSession,
        store: MemorySessionStore,
        dispatcher: DecryptionDispatcher<MemorySessionStore, SenderKeyEngine>,
    }

    fn fixture(skip: u32) -> Fixture {
        let mut outbound = OutboundSession::new(&[8; 32]);
        for _ in 0..skip {
            outbound.encrypt(b"", b"", [0; NONCE_RANDOM_SIZE]).unwrap();
        }

        let engine = Arc::new(SenderKeyEngine::new());
        let handle = engine
            .create_inbound_session(
                &SenderKeyEngine::export_session_key(&outbound.session_key()),
                Algorithm::MegolmV1,
            )
            .unwrap();

        let store = MemorySessionStore::new();
        store
            .put(&InboundGroupSession::new(
                "session".into(),
                "sender".into(),
                SessionProvenance {
                    room_id: "!room".into(),
                    shared_history: true,
                    forwarding_chain: vec!["forwarder".into()],
                    sender_claimed_ed25519_key: Some("ed25519".to_owned()),
                },
                handle,
            ))
            .unwrap();

        let dispatcher = DecryptionDispatcher::new(store.clone(), engine, SessionLocks::new(4));
        Fixture { outbound, store, dispatcher }
    }

    fn encrypted(outbound: &mut OutboundSession, plaintext: &[u8]) -> EncryptedEvent {
        let message = outbound.encrypt(plaintext, b"", [0x11; NONCE_RANDOM_SIZE]).unwrap();
        EncryptedEvent {
            event_id: None,
            room_id: RoomId::from("!room"),
            sender_key: "sender".into(),
            session_id: "session".into(),
            algorithm: Algorithm::MEGOLM_V1.to_owned(),
            ciphertext: hex::encode(message.encode()),
        }
    }

    #[test]
    fn decrypts_with_provenance() {
        let mut f = fixture(0);
        let event = encrypted(&mut f.outbound, br#"{"body":"hi"}"#);

        let decrypted = f.dispatcher.decrypt(&event).unwrap();
        assert_eq!(decrypted.json().unwrap()["body"], "hi");
        assert_eq!(decrypted.sender_key.as_str(), "sender");
        assert!(decrypted.shared_history);
        assert!(decrypted.is_forwarded());
        assert_eq!(decrypted.sender_claimed_ed25519_key.as_deref(), Some("ed25519"));
        assert_eq!(decrypted.message_index, 0);
    }

    #[test]
    fn unknown_session_is_not_found() {
        let mut f = fixture(0);
        let mut event = encrypted(&mut f.outbound, b"x");
        event.session_id = "other".into();

        assert!(matches!(
            f.dispatcher.decrypt(&event),
            Err(DecryptionError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn wrong_room_is_rejected() {
        let mut f = fixture(0);
        let mut event = encrypted(&mut f.outbound, b"x");
        event.room_id = "!elsewhere".into();

        assert!(matches!(f.dispatcher.decrypt(&event), Err(DecryptionError::RoomMismatch { .. })));
    }

    #[test]
    fn declared_algorithm_must_match() {
        let mut f = fixture(0);
        let mut event = encrypted(&mut f.outbound, b"x");
        event.algorithm = "m.megolm.v1.aes-sha2".to_owned();

        assert!(matches!(
            f.dispatcher.decrypt(&event),
            Err(DecryptionError::AlgorithmMismatch { .. })
        ));
    }

    #[test]
    fn index_before_share_is_unavailable() {
        let mut outbound = OutboundSession::new(&[8; 32]);
        let early = encrypted(&mut outbound, b"early");

        let f = fixture(1);
        assert_eq!(
            f.dispatcher.decrypt(&early),
            Err(DecryptionError::RatchetIndexUnavailable { first_known: 1, requested: 0 })
        );
    }

    #[test]
    fn truncated_ciphertext_is_malformed() {
        let mut f = fixture(0);
        let mut event = encrypted(&mut f.outbound, b"x");
        event.ciphertext.truncate(20);

        assert!(matches!(
            f.dispatcher.decrypt(&event),
            Err(DecryptionError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let mut f = fixture(0);
        let mut event = encrypted(&mut f.outbound, b"payload");
        let last = event.ciphertext.pop().unwrap();
        event.ciphertext.push(if last == '0' { '1' } else { '0' });

        assert!(matches!(f.dispatcher.decrypt(&event), Err(DecryptionError::DecryptionFailed(_))));
    }

    #[test]
    fn reused_index_with_new_event_id_is_replay() {
        let mut f = fixture(0);
        let mut event = encrypted(&mut f.outbound, b"once");
        event.event_id = Some("$first".to_owned());

        f.dispatcher.decrypt(&event).unwrap();
        f.dispatcher.decrypt(&event).unwrap();

        event.event_id = Some("$second".to_owned());
        assert_eq!(
            f.dispatcher.decrypt(&event),
            Err(DecryptionError::ReplayedMessageIndex {
                index: 0,
                first_event_id: "$first".to_owned()
            })
        );
    }

    #[test]
    fn replay_record_stays_bounded() {
        let mut f = fixture(0);
        let config = CoreConfig { replay_window: 4, replay_sessions: 2, ..CoreConfig::default() };
        let dispatcher = DecryptionDispatcher::with_config(
            f.store.clone(),
            Arc::new(SenderKeyEngine::new()),
            SessionLocks::new(4),
            &config,
        );

        let mut last = None;
        for n in 0..10 {
            let mut event = encrypted(&mut f.outbound, b"m");
            event.event_id = Some(format!("${n}"));
            dispatcher.decrypt(&event).unwrap();
            last = Some(event);
        }
        assert_eq!(dispatcher.replay.lock().unwrap().len(), 4);

        let mut replayed = last.unwrap();
        replayed.event_id = Some("$again".to_owned());
        assert_eq!(
            dispatcher.decrypt(&replayed),
            Err(DecryptionError::ReplayedMessageIndex { index: 9, first_event_id: "$9".to_owned() })
        );
    }

    #[test]
    fn index_past_skip_limit_is_reported_as_too_far_ahead() {
        let mut f = fixture(0);
        for _ in 0..=roomkey_crypto::MAX_SKIP {
            f.outbound.encrypt(b"", b"", [0; NONCE_RANDOM_SIZE]).unwrap();
        }
        let event = encrypted(&mut f.outbound, b"late");

        let err = f.dispatcher.decrypt(&event).unwrap_err();
        assert_eq!(
            err,
            DecryptionError::IndexTooFarAhead {
                first_known: 0,
                requested: roomkey_crypto::MAX_SKIP + 1
            }
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn decrypting_leaves_store_unchanged() {
        let mut f = fixture(0);
        let before = f.store.get(&"session".into(), &"sender".into()).unwrap();

        let event = encrypted(&mut f.outbound, b"x");
        f.dispatcher.decrypt(&event).unwrap();

        assert_eq!(f.store.get(&"session".into(), &"sender".into()).unwrap(), before);
    }
}
