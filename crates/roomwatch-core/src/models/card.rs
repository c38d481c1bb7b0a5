//! Card identifiers and live membership.

use super::room::RoomId;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier printed on a presence card.
///
/// Between 1 and [`CardId::MAX_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    /// Longest accepted card identifier.
    pub const MAX_LEN: usize = 15;

    /// Validate and wrap a card identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let len = value.chars().count();
        if len == 0 {
            return Err(ValidationError::EmptyCardId);
        }
        if len > Self::MAX_LEN {
            return Err(ValidationError::CardIdTooLong {
                len,
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CardId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CardId> for String {
    fn from(card: CardId) -> Self {
        card.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A card currently inside a room.
///
/// At most one record exists per card across all rooms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipRecord {
    pub card: CardId,

    pub room_id: RoomId,

    /// Last time presence was asserted
    pub entered_at: DateTime<Utc>,
}

impl MembershipRecord {
    pub fn new(card: CardId, room_id: RoomId, entered_at: DateTime<Utc>) -> Self {
        Self {
            card,
            room_id,
            entered_at,
        }
    }
}
