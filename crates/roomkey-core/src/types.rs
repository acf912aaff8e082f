//! Identifiers and small value types shared by every component.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// The raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Room a group session belongs to.
    RoomId
);

string_id!(
    /// Opaque group session identifier chosen by the sender.
    SessionId
);

string_id!(
    /// A device's curve25519 identity key.
    Curve25519Key
);

/// Storage key of an inbound group session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKeyId {
    /// Session identifier
    pub session_id: SessionId,
    /// Curve25519 key of the device that created the session
    pub sender_key: Curve25519Key,
}

impl SessionKeyId {
    /// Build a key from its two parts.
    pub fn new(session_id: SessionId, sender_key: Curve25519Key) -> Self {
        Self { session_id, sender_key }
    }
}

impl fmt::Display for SessionKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.session_id, self.sender_key)
    }
}

/// Group session algorithms this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Algorithm {
    /// HMAC-SHA256 sender ratchet with XChaCha20-Poly1305 messages.
    #[serde(rename = "m.megolm.v1.xchacha20-hmac-sha256")]
    MegolmV1,
}

impl Algorithm {
    /// Wire identifier for [`Algorithm::MegolmV1`].
    pub const MEGOLM_V1: &'static str = "m.megolm.v1.xchacha20-hmac-sha256";

    /// Parse a wire identifier. `None` for anything unrecognized.
    pub fn parse(identifier: &str) -> Option<Self> {
        match identifier {
            Self::MEGOLM_V1 => Some(Self::MegolmV1),
            _ => None,
        }
    }

    /// Wire identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MegolmV1 => Self::MEGOLM_V1,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sender's shared-history claim exactly as it appeared on the wire.
///
/// Kept three-valued until [`resolve`](Self::resolve) so "absent" never
/// silently becomes an explicit answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedHistoryHint {
    /// The event carried no flag.
    Absent,
    /// The event carried `false`.
    NotShared,
    /// The event carried `true`.
    Shared,
}

impl SharedHistoryHint {
    /// Lift the optional wire field.
    pub fn from_field(field: Option<bool>) -> Self {
        match field {
            None => Self::Absent,
            Some(false) => Self::NotShared,
            Some(true) => Self::Shared,
        }
    }

    /// Flag to store on the session.
    ///
    /// Only an explicit `true` honored under `honor_hints` yields `true`.
    pub fn resolve(self, honor_hints: bool) -> bool {
        honor_hints && self == Self::Shared
    }
}
