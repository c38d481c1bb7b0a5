//! Room model - a monitored physical space.

use crate::error::ValidationError;
use crate::token::TokenPolicy;
use serde::{Deserialize, Serialize};

/// Numeric room identifier.
pub type RoomId = u32;

/// A monitored room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Room {
    /// Unique identifier
    pub id: RoomId,

    /// Display name
    pub name: String,

    /// Number of seats
    pub capacity: u32,

    /// Device authentication token, unique across rooms
    pub token: String,
}

impl Room {
    /// Longest accepted display name.
    pub const MAX_NAME_LEN: usize = 45;

    /// Create a new room.
    pub fn new(id: RoomId, name: impl Into<String>, capacity: u32, token: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            capacity,
            token: token.into(),
        }
    }

    /// Check name and token shape.
    pub fn validate(&self, policy: &TokenPolicy) -> Result<(), ValidationError> {
        let len = self.name.chars().count();
        if len == 0 {
            return Err(ValidationError::EmptyRoomName);
        }
        if len > Self::MAX_NAME_LEN {
            return Err(ValidationError::RoomNameTooLong {
                len,
                max: Self::MAX_NAME_LEN,
            });
        }
        policy.check(&self.token)
    }
}

/// Partial room update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl RoomPatch {
    /// Apply the present fields to `room`.
    pub fn apply(&self, room: &mut Room) {
        if let Some(name) = &self.name {
            room.name = name.clone();
        }
        if let Some(capacity) = self.capacity {
            room.capacity = capacity;
        }
        if let Some(token) = &self.token {
            room.token = token.clone();
        }
    }

    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.capacity.is_none() && self.token.is_none()
    }
}
