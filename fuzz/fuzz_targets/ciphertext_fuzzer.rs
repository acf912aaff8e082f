//! Fuzz target for encrypted event decryption
//!
//! A valid session is imported, then arbitrary ciphertext bytes are
//! decrypted against it.
//!
//! # Invariants
//!
//! - Decryption never panics
//! - Only the genuine ciphertext decrypts
//! - Tampered genuine ciphertext fails

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomkey_core::{
    Algorithm, CoreConfig, EncryptedEvent, GroupSessions, MemorySessionStore,
    ROOM_KEY_EVENT_TYPE, SenderKeyEngine, ToDeviceEvent,
};
use roomkey_crypto::{OutboundSession, NONCE_RANDOM_SIZE};
use serde_json::json;

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: [u8; 32],
    random: [u8; NONCE_RANDOM_SIZE],
    plaintext: Vec<u8>,
    junk: Vec<u8>,
    flip: Option<(u16, u8)>,
}

fn event(ciphertext: String, id: &str) -> EncryptedEvent {
    EncryptedEvent {
        event_id: Some(id.to_owned()),
        room_id: "!room:example.org".into(),
        sender_key: "curve_alice".into(),
        session_id: "session".into(),
        algorithm: Algorithm::MEGOLM_V1.to_owned(),
        ciphertext,
    }
}

fuzz_target!(|scenario: Scenario| {
    let mut outbound = OutboundSession::new(&scenario.seed);
    let sessions = GroupSessions::new(
        MemorySessionStore::new(),
        SenderKeyEngine::new(),
        CoreConfig::default(),
    );

    let key_event = ToDeviceEvent {
        event_type: ROOM_KEY_EVENT_TYPE.to_owned(),
        sender_key: Some("curve_alice".to_owned()),
        content: json!({
            "algorithm": Algorithm::MEGOLM_V1,
            "room_id": "!room:example.org",
            "session_id": "session",
            "session_key": SenderKeyEngine::export_session_key(&outbound.session_key()),
        }),
    };
    assert!(sessions.on_room_key_event(&key_event).unwrap().is_stored());

    // INVARIANT 1: Junk never decrypts
    let junk = event(hex::encode(&scenario.junk), "$junk");
    assert!(sessions.decrypt(&junk).is_err(), "junk ciphertext must not decrypt");

    let sealed = outbound.encrypt(&scenario.plaintext, b"", scenario.random).unwrap();
    let bytes = sealed.encode();

    // INVARIANT 2: Tampering with any byte breaks decryption
    if let Some((position, mask)) = scenario.flip {
        if mask != 0 {
            let position = usize::from(position) % bytes.len();
            let mut tampered = bytes.clone();
            tampered[position] ^= mask;
            let result = sessions.decrypt(&event(hex::encode(&tampered), "$tampered"));
            assert!(result.is_err(), "tampered ciphertext must not decrypt");
        }
    }

    // INVARIANT 3: Genuine ciphertext decrypts to the original plaintext
    let decrypted = sessions.decrypt(&event(hex::encode(&bytes), "$genuine")).unwrap();
    assert_eq!(decrypted.plaintext, scenario.plaintext);
    assert_eq!(decrypted.message_index, 0);
});
