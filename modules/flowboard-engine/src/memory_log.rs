//! In-process implementation of [`EventLog`].
//!
//! Mirrors the subset of stream/consumer-group semantics the engine relies
//! on: monotonic ids, a shared delivery cursor, a pending ledger with idle
//! times and delivery counts, idempotent ack, and approximate retention
//! trimming. Used by the integration tests and by `--memory-log` runs of
//! the server where no Redis is available.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;

use flowboard_common::StreamId;

use crate::log::{EventLog, GroupInfo, PendingEntry, StreamEntry};

/// Entries handed out per blocking read, matching the redis-backed log.
const READ_BATCH: usize = 10;

/// Poll granularity for the bounded blocking read.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct PendingState {
    consumer: String,
    delivered_at: Instant,
    delivery_count: u64,
}

#[derive(Debug, Default)]
struct GroupState {
    last_delivered: StreamId,
    pending: HashMap<String, PendingState>,
}

#[derive(Debug, Default)]
struct State {
    next_ms: u64,
    entries: Vec<StreamEntry>,
    group: Option<GroupState>,
}

pub struct MemoryLog {
    state: Mutex<State>,
    max_len: usize,
}

impl MemoryLog {
    pub fn new(max_len: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_len,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // Lock poisoning only happens if a holder panicked; propagating the
        // inner state is still sound for a test log.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver the next unread batch to `consumer`, if any.
    fn try_deliver(&self, consumer: &str) -> Option<Vec<StreamEntry>> {
        let mut state = self.lock();
        let group = state.group.as_ref()?;
        let cursor = group.last_delivered;

        let batch: Vec<StreamEntry> = state
            .entries
            .iter()
            .filter(|e| {
                e.id.parse::<StreamId>()
                    .map(|id| id > cursor)
                    .unwrap_or(false)
            })
            .take(READ_BATCH)
            .cloned()
            .collect();
        if batch.is_empty() {
            return None;
        }

        let group = state.group.as_mut()?;
        for entry in &batch {
            if let Ok(id) = entry.id.parse::<StreamId>() {
                group.last_delivered = group.last_delivered.max(id);
            }
            group.pending.insert(
                entry.id.clone(),
                PendingState {
                    consumer: consumer.to_string(),
                    delivered_at: Instant::now(),
                    delivery_count: 1,
                },
            );
        }
        Some(batch)
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl EventLog for MemoryLog {
    async fn append(&self, fields: &[(String, String)]) -> Result<String> {
        let mut state = self.lock();
        state.next_ms += 1;
        let id = StreamId::new(state.next_ms, 0).to_string();
        state.entries.push(StreamEntry {
            id: id.clone(),
            fields: fields.to_vec(),
        });
        // Approximate retention: old entries age out, pending ids for them
        // are dropped the way the real log drops vanished entries on claim.
        if state.entries.len() > self.max_len {
            let excess = state.entries.len() - self.max_len;
            state.entries.drain(..excess);
        }
        Ok(id)
    }

    async fn create_group(&self) -> Result<()> {
        let mut state = self.lock();
        if state.group.is_none() {
            state.group = Some(GroupState::default());
        }
        Ok(())
    }

    async fn read_group(&self, consumer: &str, block: Duration) -> Result<Vec<StreamEntry>> {
        let deadline = Instant::now() + block;
        loop {
            if let Some(batch) = self.try_deliver(consumer) {
                return Ok(batch);
            }
            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn ack(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        if let Some(group) = state.group.as_mut() {
            // Idempotent: removing an absent id is a no-op.
            group.pending.remove(id);
        }
        Ok(())
    }

    async fn claim_stale(
        &self,
        consumer: &str,
        min_idle: Duration,
        max_count: usize,
    ) -> Result<Vec<StreamEntry>> {
        let mut state = self.lock();
        let State { entries, group, .. } = &mut *state;
        let Some(group) = group.as_mut() else {
            return Ok(Vec::new());
        };

        let mut stale: Vec<String> = group
            .pending
            .iter()
            .filter(|(_, p)| p.delivered_at.elapsed() >= min_idle)
            .map(|(id, _)| id.clone())
            .collect();
        stale.sort_by(|a, b| StreamId::compare_raw(a, b));
        stale.truncate(max_count);

        let mut claimed = Vec::new();
        for id in stale {
            match entries.iter().find(|e| e.id == id) {
                Some(entry) => {
                    let pending = group.pending.get_mut(&id).expect("stale id is pending");
                    pending.consumer = consumer.to_string();
                    pending.delivered_at = Instant::now();
                    pending.delivery_count += 1;
                    claimed.push(entry.clone());
                }
                None => {
                    // Entry aged out of retention; drop the dangling claim.
                    group.pending.remove(&id);
                }
            }
        }
        Ok(claimed)
    }

    async fn list_pending(&self, max_count: usize) -> Result<Vec<PendingEntry>> {
        let state = self.lock();
        let Some(group) = state.group.as_ref() else {
            return Ok(Vec::new());
        };
        let mut pending: Vec<PendingEntry> = group
            .pending
            .iter()
            .map(|(id, p)| PendingEntry {
                id: id.clone(),
                consumer: p.consumer.clone(),
                idle_ms: p.delivered_at.elapsed().as_millis() as u64,
                delivery_count: p.delivery_count,
            })
            .collect();
        pending.sort_by(|a, b| StreamId::compare_raw(&a.id, &b.id));
        pending.truncate(max_count);
        Ok(pending)
    }

    async fn group_info(&self) -> Result<Option<GroupInfo>> {
        let state = self.lock();
        Ok(state.group.as_ref().map(|g| GroupInfo {
            last_delivered_id: g.last_delivered.to_string(),
        }))
    }

    async fn recent_events(&self, max_count: usize) -> Result<Vec<StreamEntry>> {
        let state = self.lock();
        Ok(state
            .entries
            .iter()
            .rev()
            .take(max_count)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn append_assigns_monotonic_ids() {
        let log = MemoryLog::default();
        let a = log.append(&fields(&[("event", "x")])).await.unwrap();
        let b = log.append(&fields(&[("event", "y")])).await.unwrap();
        assert!(StreamId::compare_raw(&a, &b) == std::cmp::Ordering::Less);
    }

    #[tokio::test]
    async fn create_group_is_idempotent() {
        let log = MemoryLog::default();
        log.create_group().await.unwrap();
        log.create_group().await.unwrap();
        assert_eq!(
            log.group_info().await.unwrap().unwrap().last_delivered_id,
            "0-0"
        );
    }

    #[tokio::test]
    async fn read_group_delivers_each_entry_once() {
        let log = MemoryLog::default();
        log.create_group().await.unwrap();
        log.append(&fields(&[("event", "x")])).await.unwrap();

        let first = log
            .read_group("w1", Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        // Only-new semantics: a second read sees nothing.
        let second = log
            .read_group("w2", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn delivered_entries_stay_pending_until_acked() {
        let log = MemoryLog::default();
        log.create_group().await.unwrap();
        let id = log.append(&fields(&[("event", "x")])).await.unwrap();
        log.read_group("w1", Duration::from_millis(50))
            .await
            .unwrap();

        let pending = log.list_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].consumer, "w1");
        assert_eq!(pending[0].delivery_count, 1);

        log.ack(&id).await.unwrap();
        assert!(log.list_pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ack_is_idempotent() {
        let log = MemoryLog::default();
        log.create_group().await.unwrap();
        let id = log.append(&fields(&[("event", "x")])).await.unwrap();
        log.read_group("w1", Duration::from_millis(50))
            .await
            .unwrap();

        log.ack(&id).await.unwrap();
        log.ack(&id).await.unwrap();
        log.ack("999-0").await.unwrap();
    }

    #[tokio::test]
    async fn claim_stale_transfers_ownership_and_counts_deliveries() {
        let log = MemoryLog::default();
        log.create_group().await.unwrap();
        let id = log.append(&fields(&[("event", "x")])).await.unwrap();
        log.read_group("w1", Duration::from_millis(50))
            .await
            .unwrap();

        // Not yet idle long enough.
        let claimed = log
            .claim_stale("w2", Duration::from_secs(60), 50)
            .await
            .unwrap();
        assert!(claimed.is_empty());

        let claimed = log
            .claim_stale("w2", Duration::ZERO, 50)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, id);

        let pending = log.list_pending(10).await.unwrap();
        assert_eq!(pending[0].consumer, "w2");
        assert_eq!(pending[0].delivery_count, 2);
    }

    #[tokio::test]
    async fn retention_trims_oldest_entries() {
        let log = MemoryLog::new(3);
        for i in 0..5 {
            let n = i.to_string();
            log.append(&fields(&[("n", n.as_str())])).await.unwrap();
        }
        let recent = log.recent_events(10).await.unwrap();
        assert_eq!(recent.len(), 3);
        // Newest first.
        assert_eq!(recent[0].id, "5-0");
        assert_eq!(recent[2].id, "3-0");
    }

    #[tokio::test]
    async fn blocking_read_returns_empty_on_timeout() {
        let log = MemoryLog::default();
        log.create_group().await.unwrap();
        let start = Instant::now();
        let batch = log
            .read_group("w1", Duration::from_millis(30))
            .await
            .unwrap();
        assert!(batch.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
