//! Device token resolution.
//!
//! Maps a device token to its room by exact lookup on the token index.
//! Fails closed: anything other than a single consistent match is refused.

use crate::storage::{Storage, TokenLookup};
use roomwatch_core::{IngestError, Room};
use std::sync::Arc;

/// Short, non-reversible token fingerprint for logs.
pub fn fingerprint(token: &str) -> String {
    let hash = blake3::hash(token.as_bytes());
    hex::encode(&hash.as_bytes()[..6])
}

/// Resolves device tokens to rooms.
#[derive(Clone)]
pub struct TokenResolver {
    storage: Arc<Storage>,
}

impl TokenResolver {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Room identified by `token`.
    ///
    /// Unknown tokens yield [`IngestError::InvalidToken`]. The index and the
    /// room are read from one snapshot, so a token entry that points at a
    /// missing room, or at a room holding a different token, is an integrity
    /// fault and yields [`IngestError::StoreFault`].
    pub fn resolve(&self, token: &str) -> Result<Room, IngestError> {
        match self.storage.room_for_token(token)? {
            TokenLookup::Room(room) => Ok(room),
            TokenLookup::Unknown => {
                tracing::debug!(token = %fingerprint(token), "unknown device token");
                Err(IngestError::InvalidToken)
            }
            TokenLookup::Inconsistent(room_id) => {
                tracing::error!(
                    token = %fingerprint(token),
                    room_id,
                    "token index disagrees with its room"
                );
                Err(IngestError::StoreFault("token index inconsistent".into()))
            }
        }
    }
}
