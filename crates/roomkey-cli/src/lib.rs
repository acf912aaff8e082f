//! Roomkey command-line operations.
//!
//! Each command opens a [`RedbSessionStore`], runs against a
//! [`GroupSessions`] built from it, and writes JSON results to the given
//! writer.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::{fs, io::Write, path::Path};

use roomkey_core::{
    Algorithm, CoreConfig, DecryptionError, EncryptedEvent, GroupSessions, ImportOutcome,
    ROOM_KEY_EVENT_TYPE, RedbSessionStore, SenderKeyEngine, StoreError, ToDeviceEvent,
};
use roomkey_crypto::{NONCE_RANDOM_SIZE, OutboundSession, SenderKeyError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Reading an input file or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input file is not valid JSON for the command
    #[error("invalid input: {0}")]
    Json(#[from] serde_json::Error),

    /// Session store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Decryption failed
    #[error("decryption failed: {0}")]
    Decryption(#[from] DecryptionError),

    /// Outbound session could not encrypt
    #[error("encryption failed: {0}")]
    Encryption(#[from] SenderKeyError),

    /// OS randomness unavailable
    #[error("randomness unavailable: {0}")]
    Random(String),
}

/// Session facade over the on-disk store.
pub type Sessions = GroupSessions<RedbSessionStore, SenderKeyEngine>;

/// Open the store at `db` with `config`.
pub fn open(db: &Path, config: CoreConfig) -> Result<Sessions, CliError> {
    let store = RedbSessionStore::open(db)?;
    Ok(GroupSessions::new(store, SenderKeyEngine::new(), config))
}

#[derive(Serialize)]
struct ImportLine<'a> {
    event_type: &'a str,
    outcome: String,
}

/// Import every to-device event in a JSON array file.
///
/// Writes one JSON line per event. Returns the number of stored sessions.
pub fn import(sessions: &Sessions, file: &Path, out: &mut impl Write) -> Result<usize, CliError> {
    let events: Vec<ToDeviceEvent> = serde_json::from_slice(&fs::read(file)?)?;

    let mut stored = 0;
    for event in &events {
        let outcome = sessions.on_room_key_event(event)?;
        if outcome.is_stored() {
            stored += 1;
        }

        let outcome = match outcome {
            ImportOutcome::Created => "created".to_owned(),
            ImportOutcome::Replaced { first_known_index, .. } => {
                format!("replaced (first index {first_known_index})")
            },
            ImportOutcome::KeptExisting => "kept existing".to_owned(),
            ImportOutcome::Dropped(reason) => format!("dropped: {reason}"),
        };
        serde_json::to_writer(&mut *out, &ImportLine { event_type: &event.event_type, outcome })?;
        writeln!(out)?;
    }

    tracing::info!(events = events.len(), stored, "import finished");
    Ok(stored)
}

/// Answer a shared-history query.
pub fn has_shared_history(
    sessions: &Sessions,
    room_id: &str,
    session_id: &str,
    sender_key: &str,
    out: &mut impl Write,
) -> Result<bool, CliError> {
    let shared =
        sessions.has_shared_history(&room_id.into(), &session_id.into(), &sender_key.into())?;
    writeln!(out, "{}", json!({ "shared_history": shared }))?;
    Ok(shared)
}

/// Decrypt the encrypted event in `file` and write its clear content.
pub fn decrypt(sessions: &Sessions, file: &Path, out: &mut impl Write) -> Result<(), CliError> {
    let event: EncryptedEvent = serde_json::from_slice(&fs::read(file)?)?;
    let decrypted = sessions.decrypt(&event)?;

    let content = decrypted
        .json()
        .unwrap_or_else(|_| json!(String::from_utf8_lossy(&decrypted.plaintext)));
    let report = json!({
        "content": content,
        "sender_key": decrypted.sender_key,
        "forwarding_chain": decrypted.forwarding_chain,
        "shared_history": decrypted.shared_history,
        "sender_claimed_ed25519_key": decrypted.sender_claimed_ed25519_key,
        "message_index": decrypted.message_index,
    });
    writeln!(out, "{report}")?;
    Ok(())
}

/// Parameters for [`demo`].
pub struct DemoOptions<'a> {
    /// Room the key is shared for
    pub room_id: &'a str,
    /// Session identifier
    pub session_id: &'a str,
    /// Sender curve25519 key
    pub sender_key: &'a str,
    /// Shared-history flag to put on the key event, if any
    pub shared_history: Option<bool>,
    /// Messages to encrypt
    pub messages: &'a [String],
}

/// Start a fresh outbound session and write a matching room key event
/// followed by one encrypted event per message.
pub fn demo(options: &DemoOptions<'_>, out: &mut impl Write) -> Result<(), CliError> {
    let mut seed = [0u8; 32];
    getrandom::fill(&mut seed).map_err(|e| CliError::Random(e.to_string()))?;
    let mut outbound = OutboundSession::new(&seed);

    let mut content = json!({
        "algorithm": Algorithm::MEGOLM_V1,
        "room_id": options.room_id,
        "session_id": options.session_id,
        "session_key": SenderKeyEngine::export_session_key(&outbound.session_key()),
    });
    if let Some(flag) = options.shared_history {
        content["shared_history"] = json!(flag);
    }
    let room_key = ToDeviceEvent {
        event_type: ROOM_KEY_EVENT_TYPE.to_owned(),
        sender_key: Some(options.sender_key.to_owned()),
        content,
    };

    let mut encrypted = Vec::with_capacity(options.messages.len());
    for message in options.messages {
        let mut random = [0u8; NONCE_RANDOM_SIZE];
        getrandom::fill(&mut random).map_err(|e| CliError::Random(e.to_string()))?;

        let body = json!({ "body": message }).to_string();
        let sealed = outbound.encrypt(body.as_bytes(), b"", random)?;
        encrypted.push(EncryptedEvent {
            event_id: Some(format!("$demo{}", sealed.index)),
            room_id: options.room_id.into(),
            sender_key: options.sender_key.into(),
            session_id: options.session_id.into(),
            algorithm: Algorithm::MEGOLM_V1.to_owned(),
            ciphertext: hex::encode(sealed.encode()),
        });
    }

    writeln!(out, "{}", json!({ "room_keys": [room_key], "encrypted": encrypted }))?;
    Ok(())
}
