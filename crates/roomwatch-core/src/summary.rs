//! Room summaries.
//!
//! Combines the live occupant count of a room with its most recent telemetry
//! and, optionally, simple averages over a time interval. Counting and
//! averaging happen in storage; this module only shapes the result.

use crate::models::{Room, RoomId, TelemetryKind, TelemetryReading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed time interval `[from, to]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeInterval {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from <= ts && ts <= self.to
    }
}

/// Value and time of the most recent reading of one kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatestReading {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&TelemetryReading> for LatestReading {
    fn from(reading: &TelemetryReading) -> Self {
        Self {
            value: reading.value,
            timestamp: reading.timestamp,
        }
    }
}

/// Most recent reading per telemetry kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LatestReadings {
    pub temperature: Option<LatestReading>,
    pub internet: Option<LatestReading>,
    pub wifi: Option<LatestReading>,
}

impl LatestReadings {
    pub fn set(&mut self, kind: TelemetryKind, reading: Option<LatestReading>) {
        match kind {
            TelemetryKind::Temperature => self.temperature = reading,
            TelemetryKind::Internet => self.internet = reading,
            TelemetryKind::Wifi => self.wifi = reading,
        }
    }
}

/// Mean value per telemetry kind over an interval; `None` when no rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntervalAverages {
    pub temperature: Option<f64>,
    pub internet: Option<f64>,
    pub wifi: Option<f64>,
}

impl IntervalAverages {
    pub fn set(&mut self, kind: TelemetryKind, average: Option<f64>) {
        match kind {
            TelemetryKind::Temperature => self.temperature = average,
            TelemetryKind::Internet => self.internet = average,
            TelemetryKind::Wifi => self.wifi = average,
        }
    }
}

/// Overview of a single room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,

    /// Live membership count, not the last device-reported value
    pub current_occupancy: u32,

    /// `current_occupancy / capacity` in percent, one decimal
    pub occupancy_percent: f64,

    pub latest: LatestReadings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_averages: Option<IntervalAverages>,
}

impl RoomSummary {
    pub fn new(room: &Room, current_occupancy: u32, latest: LatestReadings) -> Self {
        Self {
            id: room.id,
            name: room.name.clone(),
            capacity: room.capacity,
            current_occupancy,
            occupancy_percent: occupancy_percent(current_occupancy, room.capacity),
            latest,
            interval_averages: None,
        }
    }

    pub fn with_averages(mut self, averages: IntervalAverages) -> Self {
        self.interval_averages = Some(averages);
        self
    }
}

/// Occupancy as a percentage of capacity, rounded to one decimal.
///
/// A room without seats reports 0.
pub fn occupancy_percent(count: u32, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    let percent = f64::from(count) / f64::from(capacity) * 100.0;
    (percent * 10.0).round() / 10.0
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0u64), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}
