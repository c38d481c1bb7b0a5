//! Occupancy transition engine.
//!
//! Turns enter/exit events from field devices into membership changes and
//! occupancy snapshots. Every call runs in one storage transaction:
//!
//! 1. lock the room row (serialises ledger writes for the room)
//! 2. lock the card's presence row (a card is in at most one room)
//! 3. accept or reject against current membership
//! 4. mutate membership, recount the room, append a snapshot
//! 5. commit
//!
//! Rejections return before commit, so the transaction is dropped and
//! nothing is written. The engine keeps no state between calls.
//!
//! Exits are checked strictly against the target room: a card inside room A
//! cannot be removed by an exit reported for room B.

use crate::resolver::{fingerprint, TokenResolver};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use roomwatch_core::{
    Action, CardId, IngestError, MembershipRecord, OccupancySource, Room, StateReport,
    StateReportReceipt, TransitionReceipt,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Applies transitions and state reports against injected storage.
#[derive(Clone)]
pub struct OccupancyEngine {
    storage: Arc<Storage>,
    resolver: TokenResolver,
}

impl OccupancyEngine {
    pub fn new(storage: Arc<Storage>) -> Self {
        let resolver = TokenResolver::new(Arc::clone(&storage));
        Self { storage, resolver }
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Resolve `token` and apply a transition to its room.
    pub fn submit_transition(
        &self,
        token: &str,
        card: &CardId,
        action: Action,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<TransitionReceipt, IngestError> {
        let room = self.resolver.resolve(token)?;
        self.apply_transition(&room, card, action, timestamp)
            .inspect_err(|e| log_rejection(e, token))
    }

    /// Resolve `token` and ingest a state report for its room.
    pub fn submit_state_report(
        &self,
        token: &str,
        report: &StateReport,
    ) -> Result<StateReportReceipt, IngestError> {
        let room = self.resolver.resolve(token)?;
        self.apply_state_report(&room, report)
            .inspect_err(|e| log_rejection(e, token))
    }

    /// Apply an enter or exit for `card` in `room`.
    ///
    /// Without a caller timestamp, the time the transaction began is used for
    /// both the membership row and the snapshot.
    pub fn apply_transition(
        &self,
        room: &Room,
        card: &CardId,
        action: Action,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<TransitionReceipt, IngestError> {
        let txn = self.storage.begin();
        let ts = timestamp.unwrap_or_else(Utc::now);

        // The room may have been deleted since its token was resolved.
        if txn.lock_room(room.id)?.is_none() {
            return Err(IngestError::InvalidToken);
        }

        let presence = txn.lock_presence(card)?;

        match action {
            Action::Enter => {
                if let Some(current) = &presence {
                    if current.room_id != room.id {
                        return Err(IngestError::CardElsewhere {
                            card: card.clone(),
                            room: current.room_id,
                        });
                    }
                }
                txn.put_membership(&MembershipRecord::new(card.clone(), room.id, ts))?;
            }
            Action::Exit => match presence {
                Some(current) if current.room_id == room.id => {
                    txn.delete_membership(&current)?;
                }
                _ => {
                    return Err(IngestError::NotPresent {
                        card: card.clone(),
                        room: room.id,
                    });
                }
            },
        }

        let count = txn.count_members(room.id)?;
        let snapshot = txn.append_occupancy(room.id, count, ts, OccupancySource::Membership)?;
        txn.commit()?;

        debug!(
            room_id = room.id,
            card = %card,
            %action,
            count,
            seq = snapshot.seq,
            "transition accepted"
        );

        Ok(TransitionReceipt {
            room_id: room.id,
            card: card.clone(),
            action,
            snapshot,
        })
    }

    /// Append every present field of `report` to its ledger.
    ///
    /// A reported occupancy is logged verbatim with device provenance; it is
    /// not reconciled against membership.
    pub fn apply_state_report(
        &self,
        room: &Room,
        report: &StateReport,
    ) -> Result<StateReportReceipt, IngestError> {
        let txn = self.storage.begin();
        let ts = report.timestamp.unwrap_or_else(Utc::now);

        if txn.lock_room(room.id)?.is_none() {
            return Err(IngestError::InvalidToken);
        }

        let mut telemetry = Vec::new();
        for (kind, value) in report.readings() {
            txn.append_reading(room.id, kind, value, ts)?;
            telemetry.push(kind);
        }

        if let Some(count) = report.occupancy {
            txn.append_occupancy(room.id, count, ts, OccupancySource::Device)?;
        }

        txn.commit()?;

        let receipt = StateReportReceipt {
            room_id: room.id,
            timestamp: ts,
            telemetry,
            occupancy: report.occupancy,
        };
        debug!(
            room_id = room.id,
            rows = receipt.rows_written(),
            "state report accepted"
        );
        Ok(receipt)
    }
}

fn log_rejection(err: &IngestError, token: &str) {
    match err {
        IngestError::StoreFault(reason) => {
            error!(token = %fingerprint(token), %reason, "ingestion aborted by store fault")
        }
        other => info!(token = %fingerprint(token), code = other.code(), "ingestion rejected"),
    }
}
