//! Room summary queries.

use crate::error::{Error, Result};
use crate::storage::Storage;
use roomwatch_core::{
    IntervalAverages, LatestReading, LatestReadings, Room, RoomId, RoomSummary, TelemetryKind,
    TimeInterval,
};

/// Summary of one room; averages only when an interval is given.
pub fn room_summary(
    storage: &Storage,
    id: RoomId,
    interval: Option<&TimeInterval>,
) -> Result<RoomSummary> {
    let room = storage
        .get_room(id)?
        .ok_or_else(|| Error::NotFound(format!("room {}", id)))?;

    let summary = summarize(storage, &room)?;
    match interval {
        Some(interval) => {
            let mut averages = IntervalAverages::default();
            for kind in TelemetryKind::ALL {
                averages.set(kind, storage.average(room.id, kind, interval)?);
            }
            Ok(summary.with_averages(averages))
        }
        None => Ok(summary),
    }
}

/// Summaries of all rooms, ordered by ID.
pub fn all_summaries(storage: &Storage) -> Result<Vec<RoomSummary>> {
    storage
        .list_rooms()?
        .iter()
        .map(|room| summarize(storage, room))
        .collect()
}

fn summarize(storage: &Storage, room: &Room) -> Result<RoomSummary> {
    let current = storage.count_members(room.id)?;
    let mut latest = LatestReadings::default();
    for kind in TelemetryKind::ALL {
        let reading = storage.latest_reading(room.id, kind)?;
        latest.set(kind, reading.as_ref().map(LatestReading::from));
    }
    Ok(RoomSummary::new(room, current, latest))
}
