//! Property-based tests for room key import
//!
//! - The stored flag depends only on the event's flag and the config
//! - Re-delivering an event never creates a second session
//! - Arbitrary JSON content never panics and never half-installs a session

use proptest::prelude::*;
use roomkey_core::{
    Algorithm, CoreConfig, GroupSessions, HistoryVisibility, ImportOutcome, MemorySessionStore,
    ROOM_KEY_EVENT_TYPE, SenderKeyEngine, SessionStore, StaticRoomState, ToDeviceEvent,
};
use roomkey_crypto::OutboundSession;
use serde_json::json;

fn visibility() -> impl Strategy<Value = HistoryVisibility> {
    prop_oneof![
        Just(HistoryVisibility::WorldReadable),
        Just(HistoryVisibility::Shared),
        Just(HistoryVisibility::Invited),
        Just(HistoryVisibility::Joined),
    ]
}

fn event(seed: [u8; 32], room: &str, flag: Option<bool>) -> ToDeviceEvent {
    let key = SenderKeyEngine::export_session_key(&OutboundSession::new(&seed).session_key());
    let mut content = json!({
        "algorithm": Algorithm::MEGOLM_V1,
        "room_id": room,
        "session_id": "session",
        "session_key": key,
    });
    if let Some(flag) = flag {
        content["shared_history"] = json!(flag);
    }
    ToDeviceEvent {
        event_type: ROOM_KEY_EVENT_TYPE.to_owned(),
        sender_key: Some("sender".to_owned()),
        content,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: room visibility has no say in the stored flag
    #[test]
    fn prop_flag_independent_of_visibility(
        seed in any::<[u8; 32]>(),
        flag in proptest::option::of(any::<bool>()),
        honor in any::<bool>(),
        visibility in visibility(),
    ) {
        let store = MemorySessionStore::new();
        let config = CoreConfig { honor_shared_history_hints: honor, ..CoreConfig::default() };
        let sessions = GroupSessions::new(store.clone(), SenderKeyEngine::new(), config);
        let room_state = StaticRoomState::new().with_room("!room".into(), visibility);

        prop_assert_eq!(sessions.on_room_key_event(&event(seed, "!room", flag)), Ok(ImportOutcome::Created));

        let shared = store.get(&"session".into(), &"sender".into()).unwrap().unwrap().shared_history();
        prop_assert_eq!(shared, honor && flag == Some(true));
        prop_assert_eq!(
            sessions.has_shared_history(&"!room".into(), &"session".into(), &"sender".into()).unwrap(),
            shared
        );

        let display = sessions
            .resolver()
            .history_display(&room_state, &"!room".into(), &"session".into(), &"sender".into())
            .unwrap();
        prop_assert_eq!(display.current_visibility, visibility);
        prop_assert_eq!(display.shared_history, shared);
    }

    /// Property: delivering the same event n times stores exactly one session
    #[test]
    fn prop_redelivery_is_idempotent(
        seed in any::<[u8; 32]>(),
        flag in proptest::option::of(any::<bool>()),
        deliveries in 2usize..8,
    ) {
        let store = MemorySessionStore::new();
        let sessions =
            GroupSessions::new(store.clone(), SenderKeyEngine::new(), CoreConfig::honoring_shared_history());
        let event = event(seed, "!room", flag);

        prop_assert_eq!(sessions.on_room_key_event(&event), Ok(ImportOutcome::Created));
        for _ in 1..deliveries {
            prop_assert_eq!(sessions.on_room_key_event(&event), Ok(ImportOutcome::KeptExisting));
        }
        prop_assert_eq!(store.len().unwrap(), 1);
    }

    /// Property: junk content is dropped without touching the store
    #[test]
    fn prop_junk_content_is_dropped(
        fields in prop::collection::hash_map("[a-z_]{1,12}", "[a-zA-Z0-9]{0,8}", 0..6),
    ) {
        let store = MemorySessionStore::new();
        let sessions = GroupSessions::new(store.clone(), SenderKeyEngine::new(), CoreConfig::default());

        let event = ToDeviceEvent {
            event_type: ROOM_KEY_EVENT_TYPE.to_owned(),
            sender_key: Some("sender".to_owned()),
            content: serde_json::to_value(&fields).unwrap(),
        };

        let outcome = sessions.on_room_key_event(&event);
        prop_assert!(matches!(outcome, Ok(ImportOutcome::Dropped(_))));
        prop_assert!(store.is_empty().unwrap());
    }
}
