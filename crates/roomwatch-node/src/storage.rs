//! Persistent storage using RocksDB.
//!
//! Rooms, live membership and the append-only ledgers share one
//! pessimistic [`TransactionDB`]. Ingestion runs inside a [`StoreTxn`];
//! dropping it without [`StoreTxn::commit`] discards every write.
//!
//! # Key layout
//!
//! ```text
//! room:{room}                  Room (also the per-room lock)
//! token:{token}                RoomId
//! presence:{card}              MembershipRecord, one per card
//! member:{room}:{card}         MembershipRecord, counted per room
//! seq:{room}                   u64, last ledger sequence of the room
//! occupancy:{room}:{seq}       OccupancySnapshot
//! temperature:{room}:{seq}     TelemetryReading (same for internet, wifi)
//! at:{ledger}:{room}:{ts}:{seq} TelemetryReading, ordered by timestamp
//! meta:next_room_id            u64
//! ```
//!
//! Numeric components are zero-padded so key order equals numeric order.
//! `{ts}` is the reading's microsecond timestamp with the sign bit flipped,
//! so pre-epoch times still sort first.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use roomwatch_core::summary::mean;
use roomwatch_core::{
    CardId, MembershipRecord, OccupancySnapshot, OccupancySource, Room, RoomId, RoomPatch,
    TelemetryKind, TelemetryReading, TimeInterval,
};
use rocksdb::{Direction, IteratorMode, Options, Transaction, TransactionDB, TransactionDBOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Default wait for a row lock before a transaction gives up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1000);

const OCCUPANCY_LEDGER: &str = "occupancy";
const NEXT_ROOM_ID: &[u8] = b"meta:next_room_id";

fn room_key(id: RoomId) -> String {
    format!("room:{:010}", id)
}

fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

fn presence_key(card: &CardId) -> String {
    format!("presence:{}", card)
}

fn member_prefix(room: RoomId) -> String {
    format!("member:{:010}:", room)
}

fn member_key(room: RoomId, card: &CardId) -> String {
    format!("{}{}", member_prefix(room), card)
}

fn seq_key(room: RoomId) -> String {
    format!("seq:{:010}", room)
}

fn ledger_prefix(ledger: &str, room: RoomId) -> String {
    format!("{}:{:010}:", ledger, room)
}

fn ledger_key(ledger: &str, room: RoomId, seq: u64) -> String {
    format!("{}{:020}", ledger_prefix(ledger, room), seq)
}

fn time_index_prefix(ledger: &str, room: RoomId) -> String {
    format!("at:{}:{:010}:", ledger, room)
}

fn time_sort_key(ts: DateTime<Utc>) -> u64 {
    (ts.timestamp_micros() as u64) ^ (1 << 63)
}

fn time_index_key(ledger: &str, room: RoomId, ts: DateTime<Utc>, seq: u64) -> String {
    format!("{}{:020}:{:020}", time_index_prefix(ledger, room), time_sort_key(ts), seq)
}

/// Smallest key greater than every key under `prefix` (which ends in ':').
fn prefix_upper_bound(prefix: &str) -> String {
    format!("{};", prefix.trim_end_matches(':'))
}

fn decode_u64(data: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = data
        .try_into()
        .map_err(|_| Error::Storage("Invalid stored counter".into()))?;
    Ok(u64::from_be_bytes(bytes))
}

/// Storage backend for Roomwatch data.
pub struct Storage {
    db: TransactionDB,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_lock_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Open or create storage with a custom row-lock timeout.
    pub fn open_with_lock_timeout<P: AsRef<Path>>(path: P, lock_timeout: Duration) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        // A negative timeout means "wait forever" to RocksDB.
        let lock_timeout_ms = i64::try_from(lock_timeout.as_millis()).map_err(|_| {
            Error::Config(format!("lock timeout of {:?} is too large", lock_timeout))
        })?;
        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(lock_timeout_ms);
        let db = TransactionDB::open(&opts, &txn_opts, path)?;
        Ok(Self { db })
    }

    /// Begin a transaction scope.
    pub fn begin(&self) -> StoreTxn<'_> {
        StoreTxn {
            txn: self.db.transaction(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let prefix = prefix.as_bytes();
        let mut items = Vec::new();

        let iter = self.db.prefix_iterator(prefix);
        for item in iter {
            let (key, value) = item?;
            if key.starts_with(prefix) {
                items.push(serde_json::from_slice(&value)?);
            } else {
                break;
            }
        }

        Ok(items)
    }

    /// Last value stored under `prefix`, in key order.
    fn last<T: DeserializeOwned>(&self, prefix: &str) -> Result<Option<T>> {
        let upper = prefix_upper_bound(prefix);
        let mut iter = self
            .db
            .iterator(IteratorMode::From(upper.as_bytes(), Direction::Reverse));

        match iter.next() {
            Some(item) => {
                let (key, value) = item?;
                if key.starts_with(prefix.as_bytes()) {
                    Ok(Some(serde_json::from_slice(&value)?))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    // --- Rooms ---

    /// Get a room by ID.
    pub fn get_room(&self, id: RoomId) -> Result<Option<Room>> {
        self.get_json(&room_key(id))
    }

    /// List all rooms ordered by ID.
    pub fn list_rooms(&self) -> Result<Vec<Room>> {
        self.scan("room:")
    }

    /// Room holding `token`, with the index and the room read from one snapshot.
    ///
    /// A concurrent token change is seen either entirely or not at all, so
    /// an index entry disagreeing with its room can only be corruption.
    pub fn room_for_token(&self, token: &str) -> Result<TokenLookup> {
        let snapshot = self.db.snapshot();

        let room_id: RoomId = match snapshot.get(token_key(token).as_bytes())? {
            Some(data) => serde_json::from_slice(&data)?,
            None => return Ok(TokenLookup::Unknown),
        };

        match snapshot.get(room_key(room_id).as_bytes())? {
            Some(data) => {
                let room: Room = serde_json::from_slice(&data)?;
                if room.token == token {
                    Ok(TokenLookup::Room(room))
                } else {
                    Ok(TokenLookup::Inconsistent(room_id))
                }
            }
            None => Ok(TokenLookup::Inconsistent(room_id)),
        }
    }

    /// Create a room, allocating the next ID.
    ///
    /// Fails with [`Error::Conflict`] if the token is already assigned.
    pub fn create_room(&self, name: &str, capacity: u32, token: &str) -> Result<Room> {
        let txn = self.begin();

        let id = match txn.txn.get_for_update(NEXT_ROOM_ID, true)? {
            Some(data) => decode_u64(&data)?,
            None => 1,
        };
        let id = RoomId::try_from(id)
            .map_err(|_| Error::Storage("Room id space exhausted".into()))?;

        if txn.get_json_for_update::<RoomId>(&token_key(token))?.is_some() {
            return Err(Error::Conflict("token already assigned to a room".into()));
        }

        let room = Room::new(id, name, capacity, token);
        txn.put_json(&room_key(id), &room)?;
        txn.put_json(&token_key(token), &id)?;
        txn.txn
            .put(NEXT_ROOM_ID, (u64::from(id) + 1).to_be_bytes())?;
        txn.commit()?;

        Ok(room)
    }

    /// Apply a partial update to a room, re-indexing its token if it changes.
    pub fn update_room(&self, id: RoomId, patch: &RoomPatch) -> Result<Room> {
        let txn = self.begin();
        let mut room = txn
            .lock_room(id)?
            .ok_or_else(|| Error::NotFound(format!("room {}", id)))?;
        let old_token = room.token.clone();
        patch.apply(&mut room);

        if room.token != old_token {
            if let Some(owner) = txn.get_json_for_update::<RoomId>(&token_key(&room.token))? {
                if owner != id {
                    return Err(Error::Conflict("token already assigned to a room".into()));
                }
            }
            txn.txn.delete(token_key(&old_token).as_bytes())?;
            txn.put_json(&token_key(&room.token), &id)?;
        }

        txn.put_json(&room_key(id), &room)?;
        txn.commit()?;
        Ok(room)
    }

    /// Delete a room. Refused while cards are still inside it.
    ///
    /// Ledger rows are kept.
    pub fn delete_room(&self, id: RoomId) -> Result<()> {
        let txn = self.begin();
        let room = txn
            .lock_room(id)?
            .ok_or_else(|| Error::NotFound(format!("room {}", id)))?;

        let present = txn.count_members(id)?;
        if present > 0 {
            return Err(Error::Conflict(format!(
                "room {} still has {} occupant(s)",
                id, present
            )));
        }

        txn.txn.delete(room_key(id).as_bytes())?;
        txn.txn.delete(token_key(&room.token).as_bytes())?;
        txn.commit()
    }

    // --- Membership ---

    /// Room the card is currently in, if any.
    pub fn presence_of(&self, card: &CardId) -> Result<Option<MembershipRecord>> {
        self.get_json(&presence_key(card))
    }

    /// Live membership of a room.
    pub fn list_members(&self, room: RoomId) -> Result<Vec<MembershipRecord>> {
        self.scan(&member_prefix(room))
    }

    /// Number of cards currently inside a room.
    pub fn count_members(&self, room: RoomId) -> Result<u32> {
        let prefix = member_prefix(room);
        let prefix = prefix.as_bytes();
        let mut count = 0u32;

        for item in self.db.prefix_iterator(prefix) {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            count += 1;
        }

        Ok(count)
    }

    // --- Ledgers ---

    /// Full occupancy ledger of a room, in commit order.
    pub fn occupancy_history(&self, room: RoomId) -> Result<Vec<OccupancySnapshot>> {
        self.scan(&ledger_prefix(OCCUPANCY_LEDGER, room))
    }

    /// Last committed occupancy snapshot of a room.
    pub fn latest_occupancy(&self, room: RoomId) -> Result<Option<OccupancySnapshot>> {
        self.last(&ledger_prefix(OCCUPANCY_LEDGER, room))
    }

    /// Full telemetry ledger of one kind, in commit order.
    pub fn readings(&self, room: RoomId, kind: TelemetryKind) -> Result<Vec<TelemetryReading>> {
        self.scan(&ledger_prefix(kind.ledger(), room))
    }

    /// Reading with the greatest timestamp; later commits win ties.
    pub fn latest_reading(
        &self,
        room: RoomId,
        kind: TelemetryKind,
    ) -> Result<Option<TelemetryReading>> {
        self.last(&time_index_prefix(kind.ledger(), room))
    }

    /// Mean value of one kind over a closed interval.
    pub fn average(
        &self,
        room: RoomId,
        kind: TelemetryKind,
        interval: &TimeInterval,
    ) -> Result<Option<f64>> {
        let prefix = time_index_prefix(kind.ledger(), room);
        let start = format!("{}{:020}:", prefix, time_sort_key(interval.from));
        let end = format!("{}{:020};", prefix, time_sort_key(interval.to));
        let mut values = Vec::new();

        let iter = self
            .db
            .iterator(IteratorMode::From(start.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if &*key >= end.as_bytes() {
                break;
            }
            // Index keys are microsecond precision; the bounds may not be.
            let reading: TelemetryReading = serde_json::from_slice(&value)?;
            if interval.contains(reading.timestamp) {
                values.push(reading.value);
            }
        }

        Ok(mean(values))
    }
}

/// Outcome of a token index lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLookup {
    Room(Room),
    Unknown,
    /// The index names this room but the room is missing or holds another token.
    Inconsistent(RoomId),
}

/// A single RocksDB transaction.
///
/// Locks taken with `get_for_update` are held until commit or drop. Callers
/// lock the room first and the card second, and never more than one room.
pub struct StoreTxn<'a> {
    txn: Transaction<'a, TransactionDB>,
}

impl StoreTxn<'_> {
    fn get_json_for_update<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.txn.get_for_update(key.as_bytes(), true)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_vec(value)?;
        self.txn.put(key.as_bytes(), value)?;
        Ok(())
    }

    /// Exclusively lock a room row and return the room.
    pub fn lock_room(&self, id: RoomId) -> Result<Option<Room>> {
        self.get_json_for_update(&room_key(id))
    }

    /// Exclusively lock a card's presence row and return its membership.
    pub fn lock_presence(&self, card: &CardId) -> Result<Option<MembershipRecord>> {
        self.get_json_for_update(&presence_key(card))
    }

    /// Create or refresh a membership.
    pub fn put_membership(&self, record: &MembershipRecord) -> Result<()> {
        self.put_json(&presence_key(&record.card), record)?;
        self.put_json(&member_key(record.room_id, &record.card), record)
    }

    /// Remove a membership.
    pub fn delete_membership(&self, record: &MembershipRecord) -> Result<()> {
        self.txn.delete(presence_key(&record.card).as_bytes())?;
        self.txn
            .delete(member_key(record.room_id, &record.card).as_bytes())?;
        Ok(())
    }

    /// Count live members of a room, including this transaction's writes.
    pub fn count_members(&self, room: RoomId) -> Result<u32> {
        let prefix = member_prefix(room);
        let prefix = prefix.as_bytes();
        let mut count = 0u32;

        for item in self.txn.prefix_iterator(prefix) {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            count += 1;
        }

        Ok(count)
    }

    fn next_seq(&self, room: RoomId) -> Result<u64> {
        let key = seq_key(room);
        let next = match self.txn.get_for_update(key.as_bytes(), true)? {
            Some(data) => decode_u64(&data)? + 1,
            None => 1,
        };
        self.txn.put(key.as_bytes(), next.to_be_bytes())?;
        Ok(next)
    }

    /// Append an occupancy snapshot to the room's ledger.
    pub fn append_occupancy(
        &self,
        room: RoomId,
        count: u32,
        timestamp: DateTime<Utc>,
        source: OccupancySource,
    ) -> Result<OccupancySnapshot> {
        let seq = self.next_seq(room)?;
        let snapshot = OccupancySnapshot {
            room_id: room,
            count,
            timestamp,
            source,
            seq,
        };
        self.put_json(&ledger_key(OCCUPANCY_LEDGER, room, seq), &snapshot)?;
        Ok(snapshot)
    }

    /// Append a telemetry reading to the room's ledger of that kind.
    pub fn append_reading(
        &self,
        room: RoomId,
        kind: TelemetryKind,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<TelemetryReading> {
        let seq = self.next_seq(room)?;
        let reading = TelemetryReading {
            room_id: room,
            kind,
            value,
            timestamp,
            seq,
        };
        self.put_json(&ledger_key(kind.ledger(), room, seq), &reading)?;
        self.put_json(&time_index_key(kind.ledger(), room, timestamp, seq), &reading)?;
        Ok(reading)
    }

    /// Commit all writes atomically.
    pub fn commit(self) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn token(c: char) -> String {
        c.to_string().repeat(32)
    }

    #[test]
    fn room_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let room = storage.create_room("Lab 1", 30, &token('A')).unwrap();
        assert_eq!(room.id, 1);

        let loaded = storage.get_room(room.id).unwrap().unwrap();
        assert_eq!(room, loaded);
        assert_eq!(
            storage.room_for_token(&token('A')).unwrap(),
            TokenLookup::Room(loaded)
        );
    }

    #[test]
    fn room_ids_increase() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        storage.create_room("A", 1, &token('A')).unwrap();
        storage.create_room("B", 1, &token('B')).unwrap();

        let ids: Vec<_> = storage.list_rooms().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn duplicate_token_rejected() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        storage.create_room("A", 1, &token('A')).unwrap();
        let err = storage.create_room("B", 1, &token('A')).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(storage.list_rooms().unwrap().len(), 1);
    }

    #[test]
    fn token_rotation_reindexes() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let room = storage.create_room("A", 1, &token('A')).unwrap();
        let patch = RoomPatch {
            token: Some(token('Z')),
            ..Default::default()
        };
        storage.update_room(room.id, &patch).unwrap();

        assert_eq!(storage.room_for_token(&token('A')).unwrap(), TokenLookup::Unknown);
        match storage.room_for_token(&token('Z')).unwrap() {
            TokenLookup::Room(found) => assert_eq!(found.id, room.id),
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn token_rotation_onto_taken_token_fails() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let a = storage.create_room("A", 1, &token('A')).unwrap();
        storage.create_room("B", 1, &token('B')).unwrap();
        let patch = RoomPatch {
            token: Some(token('B')),
            ..Default::default()
        };
        assert!(matches!(
            storage.update_room(a.id, &patch),
            Err(Error::Conflict(_))
        ));
        assert_eq!(storage.get_room(a.id).unwrap().unwrap().token, token('A'));
    }

    #[test]
    fn uncommitted_writes_are_discarded() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let room = storage.create_room("A", 1, &token('A')).unwrap();
        let card = CardId::new("C1").unwrap();

        {
            let txn = storage.begin();
            txn.lock_room(room.id).unwrap();
            txn.put_membership(&MembershipRecord::new(card.clone(), room.id, Utc::now()))
                .unwrap();
            assert_eq!(txn.count_members(room.id).unwrap(), 1);
            txn.append_occupancy(room.id, 1, Utc::now(), OccupancySource::Membership)
                .unwrap();
            // dropped without commit
        }

        assert_eq!(storage.count_members(room.id).unwrap(), 0);
        assert!(storage.presence_of(&card).unwrap().is_none());
        assert!(storage.occupancy_history(room.id).unwrap().is_empty());
    }

    #[test]
    fn ledger_sequence_is_shared_per_room() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let room = storage.create_room("A", 1, &token('A')).unwrap();
        let now = Utc::now();

        let txn = storage.begin();
        let t = txn
            .append_reading(room.id, TelemetryKind::Temperature, 21.0, now)
            .unwrap();
        let o = txn
            .append_occupancy(room.id, 3, now, OccupancySource::Device)
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(t.seq, 1);
        assert_eq!(o.seq, 2);
        assert_eq!(storage.latest_occupancy(room.id).unwrap().unwrap().count, 3);
    }

    #[test]
    fn members_are_scoped_to_their_room() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let a = storage.create_room("A", 5, &token('A')).unwrap();
        let b = storage.create_room("B", 5, &token('B')).unwrap();

        let txn = storage.begin();
        for card in ["1", "2"] {
            txn.put_membership(&MembershipRecord::new(CardId::new(card).unwrap(), a.id, Utc::now()))
                .unwrap();
        }
        txn.put_membership(&MembershipRecord::new(CardId::new("3").unwrap(), b.id, Utc::now()))
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.count_members(a.id).unwrap(), 2);
        assert_eq!(storage.count_members(b.id).unwrap(), 1);
        assert_eq!(storage.list_members(b.id).unwrap()[0].card.as_str(), "3");
    }

    #[test]
    fn delete_room_refused_while_occupied() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let room = storage.create_room("A", 5, &token('A')).unwrap();

        let txn = storage.begin();
        let record = MembershipRecord::new(CardId::new("1").unwrap(), room.id, Utc::now());
        txn.put_membership(&record).unwrap();
        txn.commit().unwrap();

        assert!(matches!(storage.delete_room(room.id), Err(Error::Conflict(_))));

        let txn = storage.begin();
        txn.delete_membership(&record).unwrap();
        txn.commit().unwrap();

        storage.delete_room(room.id).unwrap();
        assert!(storage.get_room(room.id).unwrap().is_none());
        assert_eq!(storage.room_for_token(&token('A')).unwrap(), TokenLookup::Unknown);
    }

    #[test]
    fn average_respects_interval() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let room = storage.create_room("A", 5, &token('A')).unwrap();
        let t0 = Utc::now();

        let txn = storage.begin();
        for (i, value) in [20.0, 22.0, 30.0].into_iter().enumerate() {
            let ts = t0 + chrono::Duration::minutes(i as i64 * 10);
            txn.append_reading(room.id, TelemetryKind::Temperature, value, ts)
                .unwrap();
        }
        txn.commit().unwrap();

        let interval = TimeInterval::new(t0, t0 + chrono::Duration::minutes(15));
        assert_eq!(
            storage
                .average(room.id, TelemetryKind::Temperature, &interval)
                .unwrap(),
            Some(21.0)
        );
        assert_eq!(
            storage.average(room.id, TelemetryKind::Wifi, &interval).unwrap(),
            None
        );
    }

    #[test]
    fn latest_reading_uses_timestamp() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let room = storage.create_room("A", 5, &token('A')).unwrap();
        let t0 = Utc::now();

        let txn = storage.begin();
        txn.append_reading(room.id, TelemetryKind::Internet, 100.0, t0)
            .unwrap();
        // late delivery of an older reading
        txn.append_reading(
            room.id,
            TelemetryKind::Internet,
            50.0,
            t0 - chrono::Duration::minutes(5),
        )
        .unwrap();
        txn.commit().unwrap();

        let latest = storage
            .latest_reading(room.id, TelemetryKind::Internet)
            .unwrap()
            .unwrap();
        assert_eq!(latest.value, 100.0);
    }

    #[test]
    fn latest_reading_tie_goes_to_later_commit() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let room = storage.create_room("A", 5, &token('A')).unwrap();
        let t0 = Utc::now();

        for value in [18.0, 19.5] {
            let txn = storage.begin();
            txn.append_reading(room.id, TelemetryKind::Temperature, value, t0)
                .unwrap();
            txn.commit().unwrap();
        }

        let latest = storage
            .latest_reading(room.id, TelemetryKind::Temperature)
            .unwrap()
            .unwrap();
        assert_eq!(latest.value, 19.5);
        assert_eq!(latest.seq, 2);
        assert!(storage
            .latest_reading(room.id, TelemetryKind::Wifi)
            .unwrap()
            .is_none());
    }

    #[test]
    fn readings_do_not_leak_across_rooms() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let a = storage.create_room("A", 5, &token('A')).unwrap();
        let b = storage.create_room("B", 5, &token('B')).unwrap();
        let t0 = Utc::now();

        let txn = storage.begin();
        txn.append_reading(b.id, TelemetryKind::Wifi, 300.0, t0).unwrap();
        txn.append_occupancy(b.id, 7, t0, OccupancySource::Device)
            .unwrap();
        txn.commit().unwrap();

        let interval = TimeInterval::new(t0 - chrono::Duration::hours(1), t0);
        assert!(storage.latest_reading(a.id, TelemetryKind::Wifi).unwrap().is_none());
        assert_eq!(storage.average(a.id, TelemetryKind::Wifi, &interval).unwrap(), None);
        assert!(storage.latest_occupancy(a.id).unwrap().is_none());
        assert_eq!(
            storage.average(b.id, TelemetryKind::Wifi, &interval).unwrap(),
            Some(300.0)
        );
        assert_eq!(storage.latest_occupancy(b.id).unwrap().unwrap().count, 7);
    }

    #[test]
    fn average_interval_is_closed_and_handles_pre_epoch() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let room = storage.create_room("A", 5, &token('A')).unwrap();
        let epoch = chrono::TimeZone::timestamp_opt(&Utc, 0, 0).unwrap();
        let before = epoch - chrono::Duration::seconds(10);
        let after = epoch + chrono::Duration::seconds(10);

        let txn = storage.begin();
        txn.append_reading(room.id, TelemetryKind::Internet, 10.0, before)
            .unwrap();
        txn.append_reading(room.id, TelemetryKind::Internet, 30.0, after)
            .unwrap();
        txn.append_reading(
            room.id,
            TelemetryKind::Internet,
            1000.0,
            after + chrono::Duration::seconds(1),
        )
        .unwrap();
        txn.commit().unwrap();

        let interval = TimeInterval::new(before, after);
        assert_eq!(
            storage
                .average(room.id, TelemetryKind::Internet, &interval)
                .unwrap(),
            Some(20.0)
        );

        let backwards = TimeInterval::new(after, before);
        assert_eq!(
            storage
                .average(room.id, TelemetryKind::Internet, &backwards)
                .unwrap(),
            None
        );
    }

    #[test]
    fn oversized_lock_timeout_is_config_error() {
        let dir = tempdir().unwrap();
        let result = Storage::open_with_lock_timeout(dir.path(), Duration::MAX);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn token_lookup_flags_dangling_index() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let txn = storage.begin();
        txn.put_json(&token_key(&token('Q')), &9u32).unwrap();
        txn.commit().unwrap();

        assert_eq!(
            storage.room_for_token(&token('Q')).unwrap(),
            TokenLookup::Inconsistent(9)
        );
    }
}
