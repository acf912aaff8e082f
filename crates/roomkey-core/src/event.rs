//! Key distribution and encrypted event payloads.
//!
//! Events arrive as untrusted JSON. Parsing either produces a fully
//! validated value or a [`RoomKeyError`]; nothing is half-parsed.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    error::{DecryptionError, RoomKeyError},
    types::{Algorithm, Curve25519Key, RoomId, SessionId, SessionKeyId, SharedHistoryHint},
};

/// Event type of a direct room key share.
pub const ROOM_KEY_EVENT_TYPE: &str = "m.room_key";

/// Event type of a re-forwarded room key.
pub const FORWARDED_ROOM_KEY_EVENT_TYPE: &str = "m.forwarded_room_key";

/// A decrypted to-device event as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToDeviceEvent {
    /// Event type
    #[serde(rename = "type")]
    pub event_type: String,
    /// Curve25519 key of the device the event was received from
    #[serde(default)]
    pub sender_key: Option<String>,
    /// Event content
    pub content: serde_json::Value,
}

#[derive(Deserialize)]
struct RoomKeyContent {
    algorithm: Option<String>,
    room_id: Option<String>,
    session_id: Option<String>,
    session_key: Option<Zeroizing<String>>,
    shared_history: Option<bool>,
    #[serde(rename = "org.matrix.msc3061.shared_history")]
    unstable_shared_history: Option<bool>,
    sender_key: Option<String>,
    forwarding_curve25519_key_chain: Option<Vec<String>>,
    sender_claimed_ed25519_key: Option<String>,
}

/// A validated room key share.
#[derive(Clone, PartialEq, Eq)]
pub struct RoomKeyEvent {
    /// Curve25519 key of the device that created the session
    pub sender_key: Curve25519Key,
    /// Room the key is for
    pub room_id: RoomId,
    /// Session identifier
    pub session_id: SessionId,
    /// Textual session key
    pub session_key: Zeroizing<String>,
    /// Group session algorithm
    pub algorithm: Algorithm,
    /// Sender's shared-history flag as received
    pub shared_history: SharedHistoryHint,
    /// Devices that re-forwarded the key, oldest first
    pub forwarding_chain: Vec<Curve25519Key>,
    /// Claimed ed25519 signing key of the session creator
    pub sender_claimed_ed25519_key: Option<String>,
}

impl RoomKeyEvent {
    /// Validate a `m.room_key` or `m.forwarded_room_key` event.
    ///
    /// For forwarded keys the creator's key comes from the content and the
    /// forwarding device is appended to the chain.
    pub fn parse(event: &ToDeviceEvent) -> Result<Self, RoomKeyError> {
        let forwarded = match event.event_type.as_str() {
            ROOM_KEY_EVENT_TYPE => false,
            FORWARDED_ROOM_KEY_EVENT_TYPE => true,
            other => return Err(RoomKeyError::UnexpectedEventType(other.to_owned())),
        };

        let content = RoomKeyContent::deserialize(&event.content)
            .map_err(|e| RoomKeyError::MalformedContent(e.to_string()))?;

        let envelope_sender = required(event.sender_key.clone(), "sender_key")?;

        let algorithm_id = required(content.algorithm, "algorithm")?;
        let algorithm = Algorithm::parse(&algorithm_id)
            .ok_or(RoomKeyError::UnknownAlgorithm(algorithm_id))?;
        let room_id = required(content.room_id, "room_id")?;
        let session_id = required(content.session_id, "session_id")?;
        let session_key = match content.session_key {
            Some(key) if !key.is_empty() => key,
            _ => return Err(RoomKeyError::MissingField("session_key")),
        };

        let (sender_key, forwarding_chain) = if forwarded {
            let creator = required(content.sender_key, "content.sender_key")?;
            let mut chain: Vec<Curve25519Key> = content
                .forwarding_curve25519_key_chain
                .unwrap_or_default()
                .into_iter()
                .map(Curve25519Key::from)
                .collect();
            chain.push(Curve25519Key::from(envelope_sender));
            (creator, chain)
        } else {
            (envelope_sender, Vec::new())
        };

        Ok(Self {
            sender_key: Curve25519Key::from(sender_key),
            room_id: RoomId::from(room_id),
            session_id: SessionId::from(session_id),
            session_key,
            algorithm,
            shared_history: SharedHistoryHint::from_field(
                content.shared_history.or(content.unstable_shared_history),
            ),
            forwarding_chain,
            sender_claimed_ed25519_key: content.sender_claimed_ed25519_key,
        })
    }

    /// Storage key of the session this event installs.
    pub fn key_id(&self) -> SessionKeyId {
        SessionKeyId::new(self.session_id.clone(), self.sender_key.clone())
    }
}

impl std::fmt::Debug for RoomKeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomKeyEvent")
            .field("sender_key", &self.sender_key)
            .field("room_id", &self.room_id)
            .field("session_id", &self.session_id)
            .field("algorithm", &self.algorithm)
            .field("shared_history", &self.shared_history)
            .field("forwarding_chain", &self.forwarding_chain)
            .finish_non_exhaustive()
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RoomKeyError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(RoomKeyError::MissingField(field)),
    }
}

/// A group-encrypted room event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEvent {
    /// Event id, used for replay detection when present
    #[serde(default)]
    pub event_id: Option<String>,
    /// Room the event was received in
    pub room_id: RoomId,
    /// Curve25519 key of the sending device
    pub sender_key: Curve25519Key,
    /// Session the event was encrypted with
    pub session_id: SessionId,
    /// Declared algorithm identifier
    pub algorithm: String,
    /// Hex of `index (u32 BE) || ratchet body`
    pub ciphertext: String,
}

impl EncryptedEvent {
    /// Storage key of the session needed to decrypt this event.
    pub fn key_id(&self) -> SessionKeyId {
        SessionKeyId::new(self.session_id.clone(), self.sender_key.clone())
    }
}

/// Ciphertext split into its ratchet index and engine body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiphertextEnvelope {
    /// Ratchet index the message was encrypted at
    pub index: u32,
    /// Engine-specific remainder
    pub body: Vec<u8>,
}

impl CiphertextEnvelope {
    /// Parse the hex ciphertext field of an [`EncryptedEvent`].
    pub fn parse(ciphertext: &str) -> Result<Self, DecryptionError> {
        let bytes = hex::decode(ciphertext)
            .map_err(|e| DecryptionError::MalformedCiphertext(e.to_string()))?;

        let Some((index, body)) = bytes.split_first_chunk::<4>() else {
            return Err(DecryptionError::MalformedCiphertext(format!(
                "{} bytes is too short for a ratchet index",
                bytes.len()
            )));
        };

        Ok(Self { index: u32::from_be_bytes(*index), body: body.to_vec() })
    }

    /// Hex text form.
    pub fn to_hex(&self) -> String {
        let mut bytes = Vec::with_capacity(4 + self.body.len());
        bytes.extend_from_slice(&self.index.to_be_bytes());
        bytes.extend_from_slice(&self.body);
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn room_key(content: serde_json::Value) -> ToDeviceEvent {
        ToDeviceEvent {
            event_type: ROOM_KEY_EVENT_TYPE.to_owned(),
            sender_key: Some("senderCurve".to_owned()),
            content,
        }
    }

    fn base_content() -> serde_json::Value {
        json!({
            "algorithm": Algorithm::MEGOLM_V1,
            "room_id": "!room:example.org",
            "session_id": "session1",
            "session_key": "00ff",
        })
    }

    #[test]
    fn parses_direct_room_key() {
        let event = RoomKeyEvent::parse(&room_key(base_content())).unwrap();

        assert_eq!(event.sender_key.as_str(), "senderCurve");
        assert_eq!(event.room_id.as_str(), "!room:example.org");
        assert_eq!(event.session_id.as_str(), "session1");
        assert_eq!(event.shared_history, SharedHistoryHint::Absent);
        assert!(event.forwarding_chain.is_empty());
    }

    #[test]
    fn shared_history_keeps_three_states() {
        let mut content = base_content();
        content["shared_history"] = json!(false);
        assert_eq!(
            RoomKeyEvent::parse(&room_key(content)).unwrap().shared_history,
            SharedHistoryHint::NotShared
        );

        let mut content = base_content();
        content["org.matrix.msc3061.shared_history"] = json!(true);
        assert_eq!(
            RoomKeyEvent::parse(&room_key(content)).unwrap().shared_history,
            SharedHistoryHint::Shared
        );
    }

    #[test]
    fn both_flag_names_prefer_stable() {
        let mut content = base_content();
        content["shared_history"] = json!(true);
        content["org.matrix.msc3061.shared_history"] = json!(true);
        assert_eq!(
            RoomKeyEvent::parse(&room_key(content)).unwrap().shared_history,
            SharedHistoryHint::Shared
        );

        let mut content = base_content();
        content["shared_history"] = json!(false);
        content["org.matrix.msc3061.shared_history"] = json!(true);
        assert_eq!(
            RoomKeyEvent::parse(&room_key(content)).unwrap().shared_history,
            SharedHistoryHint::NotShared
        );
    }

    #[test]
    fn non_boolean_flag_is_malformed() {
        let mut content = base_content();
        content["shared_history"] = json!("true");
        assert!(matches!(
            RoomKeyEvent::parse(&room_key(content)),
            Err(RoomKeyError::MalformedContent(_))
        ));
    }

    #[test]
    fn missing_or_empty_fields_are_rejected() {
        for field in ["algorithm", "room_id", "session_id", "session_key"] {
            let mut content = base_content();
            content.as_object_mut().unwrap().remove(field);
            assert_eq!(
                RoomKeyEvent::parse(&room_key(content)),
                Err(RoomKeyError::MissingField(field))
            );

            let mut content = base_content();
            content[field] = json!("");
            assert!(RoomKeyEvent::parse(&room_key(content)).is_err());
        }

        let mut event = room_key(base_content());
        event.sender_key = None;
        assert_eq!(RoomKeyEvent::parse(&event), Err(RoomKeyError::MissingField("sender_key")));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let mut content = base_content();
        content["algorithm"] = json!("m.olm.v1.curve25519-aes-sha2");
        assert!(matches!(
            RoomKeyEvent::parse(&room_key(content)),
            Err(RoomKeyError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn forwarded_key_extends_chain_with_forwarder() {
        let mut content = base_content();
        content["sender_key"] = json!("creatorCurve");
        content["forwarding_curve25519_key_chain"] = json!(["hop1"]);

        let event = RoomKeyEvent::parse(&ToDeviceEvent {
            event_type: FORWARDED_ROOM_KEY_EVENT_TYPE.to_owned(),
            sender_key: Some("forwarderCurve".to_owned()),
            content,
        })
        .unwrap();

        assert_eq!(event.sender_key.as_str(), "creatorCurve");
        let chain: Vec<&str> = event.forwarding_chain.iter().map(Curve25519Key::as_str).collect();
        assert_eq!(chain, ["hop1", "forwarderCurve"]);
    }

    #[test]
    fn other_event_types_are_rejected() {
        let mut event = room_key(base_content());
        event.event_type = "m.room.message".to_owned();
        assert!(matches!(RoomKeyEvent::parse(&event), Err(RoomKeyError::UnexpectedEventType(_))));
    }

    #[test]
    fn envelope_parses_index_prefix() {
        let envelope = CiphertextEnvelope { index: 7, body: vec![1, 2, 3] };
        assert_eq!(CiphertextEnvelope::parse(&envelope.to_hex()).unwrap(), envelope);
    }

    #[test]
    fn short_or_non_hex_ciphertext_is_malformed() {
        assert!(matches!(
            CiphertextEnvelope::parse("0001"),
            Err(DecryptionError::MalformedCiphertext(_))
        ));
        assert!(matches!(
            CiphertextEnvelope::parse("zz"),
            Err(DecryptionError::MalformedCiphertext(_))
        ));
    }
}
