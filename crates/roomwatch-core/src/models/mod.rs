//! Occupancy and telemetry models.
//!
//! # Entities
//!
//! - [`Room`] - a monitored space with a capacity and a unique device token
//! - [`MembershipRecord`] - "this card is currently inside this room"
//!
//! # Ledger facts (append-only)
//!
//! - [`OccupancySnapshot`] - point-in-time occupant count, with provenance
//! - [`TelemetryReading`] - temperature or link speed reading
//!
//! # Requests and receipts
//!
//! - [`Action`] - enter or exit
//! - [`StateReport`] - sparse bundle of raw sensor readings
//! - [`TransitionReceipt`], [`StateReportReceipt`] - what an accepted call wrote

mod card;
mod ledger;
mod report;
mod room;
mod transition;

pub use card::{CardId, MembershipRecord};
pub use ledger::{OccupancySnapshot, OccupancySource, TelemetryKind, TelemetryReading};
pub use report::{StateReport, StateReportReceipt};
pub use room::{Room, RoomId, RoomPatch};
pub use transition::{Action, TransitionReceipt};
