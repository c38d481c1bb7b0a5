//! Roomwatch Core - occupancy domain model
//!
//! Pure types shared by every Roomwatch component. Nothing in this crate
//! performs I/O; storage, transport and the transition engine live in
//! `roomwatch-node`.
//!
//! # Contents
//!
//! - **Models**: [`Room`], [`CardId`], [`MembershipRecord`],
//!   [`OccupancySnapshot`], [`TelemetryReading`], [`StateReport`]
//! - **Errors**: [`IngestError`] is the closed set of outcomes a device can
//!   receive besides acceptance, each tagged with an [`ErrorClass`]
//! - **Tokens**: [`TokenPolicy`] carries the expected device token length
//! - **Summaries**: [`RoomSummary`] combines live occupancy with the latest
//!   telemetry of a room
//!
//! # Invariants
//!
//! A card is inside at most one room at any instant, and every derived
//! occupancy snapshot equals the number of live membership records of its
//! room at commit time. The types here only describe those facts; the engine
//! in `roomwatch-node` enforces them.

pub mod error;
pub mod models;
pub mod summary;
pub mod token;

pub use error::{ErrorClass, IngestError, ValidationError};
pub use models::{
    Action, CardId, MembershipRecord, OccupancySnapshot, OccupancySource, Room, RoomId,
    RoomPatch, StateReport, StateReportReceipt, TelemetryKind, TelemetryReading,
    TransitionReceipt,
};
pub use summary::{IntervalAverages, LatestReading, LatestReadings, RoomSummary, TimeInterval};
pub use token::{TokenPolicy, DEFAULT_TOKEN_LEN};
