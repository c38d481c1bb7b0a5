//! Device state reports - sparse bundles of raw readings.

use super::ledger::TelemetryKind;
use super::room::RoomId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw readings reported by a device.
///
/// Each field is independently present or absent. A present field produces
/// exactly one ledger row; an absent one produces none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_speed: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_speed: Option<f64>,

    /// Device-asserted occupant count, logged without reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<u32>,
}

impl StateReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn with_link_speed(mut self, value: f64) -> Self {
        self.link_speed = Some(value);
        self
    }

    pub fn with_wifi_speed(mut self, value: f64) -> Self {
        self.wifi_speed = Some(value);
        self
    }

    pub fn with_occupancy(mut self, count: u32) -> Self {
        self.occupancy = Some(count);
        self
    }

    /// Present telemetry values, in ledger order.
    pub fn readings(&self) -> impl Iterator<Item = (TelemetryKind, f64)> + '_ {
        [
            (TelemetryKind::Temperature, self.temperature),
            (TelemetryKind::Internet, self.link_speed),
            (TelemetryKind::Wifi, self.wifi_speed),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.map(|v| (kind, v)))
    }
}

/// What an accepted state report wrote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateReportReceipt {
    pub room_id: RoomId,

    pub timestamp: DateTime<Utc>,

    /// Telemetry ledgers that received a row
    pub telemetry: Vec<TelemetryKind>,

    /// Device-asserted count appended to the occupancy ledger, if any
    pub occupancy: Option<u32>,
}

impl StateReportReceipt {
    /// Total rows appended across all ledgers.
    pub fn rows_written(&self) -> usize {
        self.telemetry.len() + usize::from(self.occupancy.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_skip_absent_fields() {
        let report = StateReport::new().with_temperature(22.5).with_wifi_speed(80.0);
        let readings: Vec<_> = report.readings().collect();
        assert_eq!(
            readings,
            vec![(TelemetryKind::Temperature, 22.5), (TelemetryKind::Wifi, 80.0)]
        );
    }

    #[test]
    fn occupancy_alone_has_no_readings() {
        let report = StateReport::new().with_occupancy(0);
        assert_eq!(report.readings().count(), 0);
        assert_eq!(report.occupancy, Some(0));
    }

    #[test]
    fn missing_json_fields_are_absent() {
        let report: StateReport = serde_json::from_str(r#"{"temperature": 21.0}"#).unwrap();
        assert_eq!(report.temperature, Some(21.0));
        assert_eq!(report.link_speed, None);
        assert_eq!(report.occupancy, None);
        assert_eq!(report.timestamp, None);
    }

    #[test]
    fn receipt_counts_rows() {
        let receipt = StateReportReceipt {
            room_id: 1,
            timestamp: Utc::now(),
            telemetry: vec![TelemetryKind::Temperature],
            occupancy: Some(4),
        };
        assert_eq!(receipt.rows_written(), 2);
    }
}
