//! Demo output fed back through import, query and decrypt.

use std::fs;

use roomkey_cli::DemoOptions;
use roomkey_core::CoreConfig;
use serde_json::Value;
use tempfile::TempDir;

fn demo_output(shared_history: Option<bool>, messages: &[String]) -> Value {
    let options = DemoOptions {
        room_id: "!room:example.org",
        session_id: "session1",
        sender_key: "curve_alice",
        shared_history,
        messages,
    };
    let mut out = Vec::new();
    roomkey_cli::demo(&options, &mut out).unwrap();
    serde_json::from_slice(&out).unwrap()
}

fn honoring() -> CoreConfig {
    CoreConfig { honor_shared_history_hints: true, ..CoreConfig::default() }
}

#[test]
fn demo_import_query_decrypt() {
    let dir = TempDir::new().unwrap();
    let messages = vec!["first".to_owned(), "second".to_owned()];
    let mut demo = demo_output(Some(true), &messages);
    demo["room_keys"][0]["content"]["sender_claimed_ed25519_key"] = "ed25519_alice".into();

    let keys = dir.path().join("keys.json");
    fs::write(&keys, demo["room_keys"].to_string()).unwrap();

    let sessions = roomkey_cli::open(&dir.path().join("db.redb"), honoring()).unwrap();
    let mut out = Vec::new();
    assert_eq!(roomkey_cli::import(&sessions, &keys, &mut out).unwrap(), 1);
    assert!(String::from_utf8(out).unwrap().contains("created"));

    let mut out = Vec::new();
    let shared = roomkey_cli::has_shared_history(
        &sessions,
        "!room:example.org",
        "session1",
        "curve_alice",
        &mut out,
    )
    .unwrap();
    assert!(shared);

    let second = dir.path().join("event.json");
    fs::write(&second, demo["encrypted"][1].to_string()).unwrap();
    let mut out = Vec::new();
    roomkey_cli::decrypt(&sessions, &second, &mut out).unwrap();

    let report: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["content"]["body"], "second");
    assert_eq!(report["message_index"], 1);
    assert_eq!(report["shared_history"], true);
    assert_eq!(report["sender_claimed_ed25519_key"], "ed25519_alice");
}

#[test]
fn hint_ignored_without_config() {
    let dir = TempDir::new().unwrap();
    let demo = demo_output(Some(true), &[]);

    let keys = dir.path().join("keys.json");
    fs::write(&keys, demo["room_keys"].to_string()).unwrap();

    let sessions =
        roomkey_cli::open(&dir.path().join("db.redb"), CoreConfig::default()).unwrap();
    roomkey_cli::import(&sessions, &keys, &mut Vec::new()).unwrap();

    let shared = roomkey_cli::has_shared_history(
        &sessions,
        "!room:example.org",
        "session1",
        "curve_alice",
        &mut Vec::new(),
    )
    .unwrap();
    assert!(!shared);
}

#[test]
fn decrypt_without_key_fails() {
    let dir = TempDir::new().unwrap();
    let demo = demo_output(None, &["lost".to_owned()]);

    let event = dir.path().join("event.json");
    fs::write(&event, demo["encrypted"][0].to_string()).unwrap();

    let sessions =
        roomkey_cli::open(&dir.path().join("db.redb"), CoreConfig::default()).unwrap();
    let err = roomkey_cli::decrypt(&sessions, &event, &mut Vec::new()).unwrap_err();
    assert!(matches!(err, roomkey_cli::CliError::Decryption(_)));
}
