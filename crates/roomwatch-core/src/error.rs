//! Error types for Roomwatch ingestion.

use crate::models::{CardId, RoomId};
use thiserror::Error;

/// Why a device submission was not accepted.
///
/// Every variant is a no-op on durable state: nothing is written unless the
/// submission is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The device token does not identify any room.
    #[error("invalid device token")]
    InvalidToken,

    /// The card is already inside another room.
    #[error("card {card} is already present in room {room}")]
    CardElsewhere { card: CardId, room: RoomId },

    /// Exit for a card that is not inside the target room.
    #[error("card {card} is not present in room {room}")]
    NotPresent { card: CardId, room: RoomId },

    /// Transaction or commit failure. Safe to retry.
    #[error("store fault: {0}")]
    StoreFault(String),
}

/// Coarse class of an [`IngestError`], used by transports to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Access denied: unknown device.
    Authentication,
    /// Business-rule conflict: the request itself was wrong.
    Conflict,
    /// Infrastructure fault: try again.
    Transient,
}

impl IngestError {
    /// Class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            IngestError::InvalidToken => ErrorClass::Authentication,
            IngestError::CardElsewhere { .. } | IngestError::NotPresent { .. } => {
                ErrorClass::Conflict
            }
            IngestError::StoreFault(_) => ErrorClass::Transient,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::InvalidToken => "INVALID_TOKEN",
            IngestError::CardElsewhere { .. } => "CARD_ELSEWHERE",
            IngestError::NotPresent { .. } => "NOT_PRESENT",
            IngestError::StoreFault(_) => "STORE_FAULT",
        }
    }

    /// Whether retrying the identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Malformed field values, rejected before they reach the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("card id must not be empty")]
    EmptyCardId,

    #[error("card id has {len} characters, at most {max} allowed")]
    CardIdTooLong { len: usize, max: usize },

    #[error("token has {actual} characters, expected {expected}")]
    TokenLength { expected: usize, actual: usize },

    #[error("room name must not be empty")]
    EmptyRoomName,

    #[error("room name has {len} characters, at most {max} allowed")]
    RoomNameTooLong { len: usize, max: usize },
}
