//! Kanban projection types and the pure lane classification.
//!
//! The board is derived on demand from (recent events, group cursor, pending
//! id set) and discarded after transmission. Nothing here touches the log.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::stream_id::StreamId;

/// One event as presented on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanCard {
    pub id: String,
    #[serde(rename = "docId")]
    pub doc_id: String,
    pub event: String,
    pub time: String,
}

/// Three-lane projection, newest-first within each lane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanBoard {
    pub waiting: Vec<KanbanCard>,
    pub processing: Vec<KanbanCard>,
    pub completed: Vec<KanbanCard>,
}

impl KanbanBoard {
    pub fn push(&mut self, lane: Lane, card: KanbanCard) {
        match lane {
            Lane::Waiting => self.waiting.push(card),
            Lane::Processing => self.processing.push(card),
            Lane::Completed => self.completed.push(card),
        }
    }

    pub fn len(&self) -> usize {
        self.waiting.len() + self.processing.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Waiting,
    Processing,
    Completed,
}

/// Classify one event id against the group's delivery state.
///
/// Precedence: pending beats everything (delivered, not settled); otherwise
/// an id above the cursor was never handed to a consumer; anything else was
/// delivered and acknowledged.
pub fn classify(id: &str, pending: &HashSet<String>, last_delivered: &str) -> Lane {
    if pending.contains(id) {
        Lane::Processing
    } else if StreamId::compare_raw(id, last_delivered) == Ordering::Greater {
        Lane::Waiting
    } else {
        Lane::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn undelivered_event_is_waiting() {
        assert_eq!(classify("5-0", &pending(&[]), "3-0"), Lane::Waiting);
    }

    #[test]
    fn delivered_and_settled_is_completed() {
        assert_eq!(classify("2-0", &pending(&[]), "3-0"), Lane::Completed);
    }

    #[test]
    fn cursor_boundary_is_completed() {
        // The cursor id itself has been delivered.
        assert_eq!(classify("3-0", &pending(&[]), "3-0"), Lane::Completed);
    }

    #[test]
    fn pending_beats_cursor_position() {
        // Pending wins even for ids above the cursor snapshot.
        assert_eq!(classify("9-0", &pending(&["9-0"]), "3-0"), Lane::Processing);
        assert_eq!(classify("1-0", &pending(&["1-0"]), "3-0"), Lane::Processing);
    }

    #[test]
    fn absent_group_leaves_everything_waiting() {
        assert_eq!(classify("1-0", &pending(&[]), "0-0"), Lane::Waiting);
    }

    #[test]
    fn classification_is_deterministic() {
        let p = pending(&["4-0"]);
        for _ in 0..3 {
            assert_eq!(classify("4-0", &p, "5-0"), Lane::Processing);
            assert_eq!(classify("6-1", &p, "5-0"), Lane::Waiting);
            assert_eq!(classify("5-0", &p, "5-0"), Lane::Completed);
        }
    }

    #[test]
    fn board_serializes_wire_field_names() {
        let mut board = KanbanBoard::default();
        board.push(
            Lane::Waiting,
            KanbanCard {
                id: "1-0".into(),
                doc_id: "D1".into(),
                event: "DOCUMENT_SUBMITTED".into(),
                time: "2026-01-01T00:00:00Z".into(),
            },
        );
        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json["waiting"][0]["docId"], "D1");
        assert!(json["processing"].as_array().unwrap().is_empty());
        assert!(json["completed"].as_array().unwrap().is_empty());
    }
}
