//! Fuzz target for room key event import
//!
//! Feeds arbitrary content fields through the handler.
//!
//! # Invariants
//!
//! - Import never panics and never fails against the memory store
//! - A session is stored only when the outcome says so
//! - The recorded flag is true only for an explicit `true` hint while honoring

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomkey_core::{
    Algorithm, CoreConfig, GroupSessions, MemorySessionStore, ROOM_KEY_EVENT_TYPE,
    SenderKeyEngine, ToDeviceEvent,
};
use roomkey_crypto::OutboundSession;
use serde_json::{json, Value};

#[derive(Debug, Arbitrary)]
enum Field {
    Missing,
    Valid,
    Text(String),
    Number(i64),
    Bool(bool),
}

#[derive(Debug, Arbitrary)]
struct Scenario {
    honor: bool,
    seed: [u8; 32],
    room_id: Field,
    session_id: Field,
    session_key: Field,
    algorithm: Field,
    shared_history: Option<bool>,
    sender_key: Option<String>,
}

fn resolve(field: &Field, valid: Value) -> Option<Value> {
    match field {
        Field::Missing => None,
        Field::Valid => Some(valid),
        Field::Text(s) => Some(json!(s)),
        Field::Number(n) => Some(json!(n)),
        Field::Bool(b) => Some(json!(b)),
    }
}

fuzz_target!(|scenario: Scenario| {
    let outbound = OutboundSession::new(&scenario.seed);
    let key = SenderKeyEngine::export_session_key(&outbound.session_key());

    let mut content = serde_json::Map::new();
    let fields = [
        ("room_id", resolve(&scenario.room_id, json!("!room:example.org"))),
        ("session_id", resolve(&scenario.session_id, json!("session"))),
        ("session_key", resolve(&scenario.session_key, json!(key))),
        ("algorithm", resolve(&scenario.algorithm, json!(Algorithm::MEGOLM_V1))),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            content.insert(name.to_owned(), value);
        }
    }
    if let Some(flag) = scenario.shared_history {
        content.insert("shared_history".to_owned(), json!(flag));
    }

    let config = CoreConfig { honor_shared_history_hints: scenario.honor, ..CoreConfig::default() };
    let store = MemorySessionStore::new();
    let sessions = GroupSessions::new(store.clone(), SenderKeyEngine::new(), config);

    let event = ToDeviceEvent {
        event_type: ROOM_KEY_EVENT_TYPE.to_owned(),
        sender_key: scenario.sender_key.clone(),
        content: Value::Object(content.clone()),
    };

    // INVARIANT 1: Import never fails against the memory store
    let outcome = sessions.on_room_key_event(&event).unwrap();

    // INVARIANT 2: Store contents match the outcome
    let len = store.len().unwrap();
    assert_eq!(len, usize::from(outcome.is_stored()), "store must match outcome");

    if !outcome.is_stored() {
        return;
    }

    // INVARIANT 3: Flag follows the hint only while honoring
    let (Some(Value::String(room)), Some(Value::String(session)), Some(sender)) =
        (content.get("room_id"), content.get("session_id"), scenario.sender_key.as_deref())
    else {
        panic!("stored session without identifiers");
    };
    let shared = sessions
        .has_shared_history(&room.as_str().into(), &session.as_str().into(), &sender.into())
        .unwrap();
    assert_eq!(shared, scenario.honor && scenario.shared_history == Some(true));
});
