//! On-demand kanban projection of the stream.
//!
//! Nothing is cached or persisted: every call re-reads the recent window,
//! the group cursor, and the pending ledger, and classifies each event with
//! the pure function in flowboard-common. Sub-query failures degrade to
//! conservative defaults (cursor `0-0`, empty pending set) instead of
//! failing the whole projection — deliberate accuracy-for-availability
//! trade-off.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use flowboard_common::board::{classify, KanbanBoard, KanbanCard};

use crate::log::{EventLog, StreamEntry};

#[derive(Clone)]
pub struct BoardProjector {
    log: Arc<dyn EventLog>,
    fetch_count: usize,
}

impl BoardProjector {
    pub fn new(log: Arc<dyn EventLog>, fetch_count: usize) -> Self {
        Self { log, fetch_count }
    }

    /// Derive the board from current log state. Never fails: on a total
    /// fetch failure the board is simply empty.
    pub async fn project(&self) -> KanbanBoard {
        let entries = match self.log.recent_events(self.fetch_count).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Error fetching recent events for board");
                return KanbanBoard::default();
            }
        };

        let last_delivered = match self.log.group_info().await {
            Ok(Some(info)) => info.last_delivered_id,
            // Group not created yet: nothing has been delivered.
            Ok(None) => "0-0".to_string(),
            Err(e) => {
                warn!(error = %e, "Error fetching group info, assuming zero cursor");
                "0-0".to_string()
            }
        };

        // The pending window is larger than the event window so no fetched
        // event is misread as settled for lack of ledger rows.
        let pending: HashSet<String> = match self.log.list_pending(self.fetch_count * 2).await {
            Ok(pending) => pending.into_iter().map(|p| p.id).collect(),
            Err(e) => {
                warn!(error = %e, "Error fetching pending entries, assuming none");
                HashSet::new()
            }
        };

        let mut board = KanbanBoard::default();
        for entry in entries {
            let lane = classify(&entry.id, &pending, &last_delivered);
            board.push(lane, card_from(entry));
        }
        board
    }
}

/// Present one raw entry as a card. Tolerant of malformed entries — the
/// board shows what is there rather than erroring.
fn card_from(entry: StreamEntry) -> KanbanCard {
    let get = |key: &str| {
        entry
            .fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    };
    KanbanCard {
        doc_id: get("docId"),
        event: get("event"),
        time: get("timestamp"),
        id: entry.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_tolerates_missing_fields() {
        let card = card_from(StreamEntry {
            id: "7-0".into(),
            fields: vec![("docId".into(), "D7".into())],
        });
        assert_eq!(card.id, "7-0");
        assert_eq!(card.doc_id, "D7");
        assert_eq!(card.event, "Unknown");
        assert_eq!(card.time, "Unknown");
    }
}
