//! Read-only view of room state.
//!
//! Room visibility is mutable and can be changed by room admins after keys
//! have been distributed. Nothing here feeds into a session's
//! shared-history flag; it exists for display.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::RoomId;

/// Who can read a room's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryVisibility {
    /// Anyone, including non-members
    WorldReadable,
    /// All members, including those who joined later
    Shared,
    /// Members from the point they were invited
    Invited,
    /// Members from the point they joined
    Joined,
}

/// Source of current room state.
pub trait RoomStateProvider: Send + Sync {
    /// Current history visibility of `room_id`.
    fn history_visibility(&self, room_id: &RoomId) -> HistoryVisibility;
}

/// Fixed visibility table, falling back to `Shared` for unknown rooms.
#[derive(Debug, Clone, Default)]
pub struct StaticRoomState {
    rooms: HashMap<RoomId, HistoryVisibility>,
}

impl StaticRoomState {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the visibility of a room.
    pub fn with_room(mut self, room_id: RoomId, visibility: HistoryVisibility) -> Self {
        self.rooms.insert(room_id, visibility);
        self
    }
}

impl RoomStateProvider for StaticRoomState {
    fn history_visibility(&self, room_id: &RoomId) -> HistoryVisibility {
        self.rooms.get(room_id).copied().unwrap_or(HistoryVisibility::Shared)
    }
}
