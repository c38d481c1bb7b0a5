//! Enter/exit transitions.

use super::card::CardId;
use super::ledger::OccupancySnapshot;
use super::room::RoomId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Enter,
    Exit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Enter => f.write_str("enter"),
            Action::Exit => f.write_str("exit"),
        }
    }
}

/// Result of an accepted transition: the snapshot it committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionReceipt {
    pub room_id: RoomId,
    pub card: CardId,
    pub action: Action,
    pub snapshot: OccupancySnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_format() {
        assert_eq!(serde_json::to_string(&Action::Enter).unwrap(), "\"enter\"");
        let exit: Action = serde_json::from_str("\"exit\"").unwrap();
        assert_eq!(exit, Action::Exit);
        assert!(serde_json::from_str::<Action>("\"leave\"").is_err());
    }
}
