//! Append-only ledger facts.

use super::room::RoomId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an occupancy count came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OccupancySource {
    /// Derived from live membership by the transition engine.
    Membership,
    /// Asserted verbatim by a device state report.
    Device,
}

/// Occupant count of a room at a point in time. Never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OccupancySnapshot {
    pub room_id: RoomId,

    pub count: u32,

    pub timestamp: DateTime<Utc>,

    pub source: OccupancySource,

    /// Position in the room's ledger, increasing in commit order
    pub seq: u64,
}

/// Kind of telemetry reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    /// Degrees Celsius
    Temperature,
    /// Wired link speed
    Internet,
    /// Wireless link speed
    Wifi,
}

impl TelemetryKind {
    pub const ALL: [TelemetryKind; 3] = [
        TelemetryKind::Temperature,
        TelemetryKind::Internet,
        TelemetryKind::Wifi,
    ];

    /// Ledger name, also used as the storage key prefix.
    pub fn ledger(self) -> &'static str {
        match self {
            TelemetryKind::Temperature => "temperature",
            TelemetryKind::Internet => "internet",
            TelemetryKind::Wifi => "wifi",
        }
    }
}

/// A single telemetry reading. Never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryReading {
    pub room_id: RoomId,

    pub kind: TelemetryKind,

    pub value: f64,

    pub timestamp: DateTime<Utc>,

    pub seq: u64,
}
