//! Redis-streams implementation of [`EventLog`].
//!
//! One `ConnectionManager` is shared by the producer, the dispatch loop and
//! the recovery sweep; mutual exclusion at delivery granularity comes from
//! the stream's group mechanics, so no in-process locking is needed.
//!
//! Replies are walked as raw [`redis::Value`] so the same parsing works for
//! both RESP2 arrays and RESP3 maps.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Value;
use tracing::info;

use crate::log::{EventLog, GroupInfo, PendingEntry, StreamEntry};

/// Entries fetched per blocking read.
const READ_BATCH: usize = 10;

#[derive(Clone)]
pub struct RedisLog {
    conn: ConnectionManager,
    stream_key: String,
    group_name: String,
    max_len: usize,
}

impl RedisLog {
    /// Connect to Redis and scope the log to one stream and group.
    pub async fn connect(
        url: &str,
        stream_key: impl Into<String>,
        group_name: impl Into<String>,
        max_len: usize,
    ) -> Result<Self> {
        let client = redis::Client::open(url).with_context(|| format!("invalid redis url {url}"))?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to redis")?;
        info!(url, "Connected to redis");
        Ok(Self {
            conn,
            stream_key: stream_key.into(),
            group_name: group_name.into(),
            max_len,
        })
    }
}

#[async_trait]
impl EventLog for RedisLog {
    async fn append(&self, fields: &[(String, String)]) -> Result<String> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.stream_key)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*");
        for (key, value) in fields {
            cmd.arg(key).arg(value);
        }
        let id: String = cmd
            .query_async(&mut conn)
            .await
            .context("XADD failed")?;
        Ok(id)
    }

    async fn create_group(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let res: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(&self.group_name)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        match res {
            Ok(()) => Ok(()),
            // Group already exists — startup is idempotent.
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e).context("XGROUP CREATE failed"),
        }
    }

    async fn read_group(&self, consumer: &str, block: Duration) -> Result<Vec<StreamEntry>> {
        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group_name)
            .arg(consumer)
            .arg("COUNT")
            .arg(READ_BATCH)
            .arg("BLOCK")
            .arg(block.as_millis() as u64)
            .arg("STREAMS")
            .arg(&self.stream_key)
            .arg(">")
            .query_async(&mut conn)
            .await
            .context("XREADGROUP failed")?;

        if matches!(reply, Value::Nil) {
            return Ok(Vec::new());
        }
        // Reply shape: one (stream name, entries) pair per requested stream.
        match pairs(reply)?.into_iter().next() {
            Some((_name, entries)) => entries_from(entries),
            None => Ok(Vec::new()),
        }
    }

    async fn ack(&self, id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        // XACK returns the number of entries settled; 0 for an already
        // settled id, which is fine.
        let _settled: u64 = redis::cmd("XACK")
            .arg(&self.stream_key)
            .arg(&self.group_name)
            .arg(id)
            .query_async(&mut conn)
            .await
            .context("XACK failed")?;
        Ok(())
    }

    async fn claim_stale(
        &self,
        consumer: &str,
        min_idle: Duration,
        max_count: usize,
    ) -> Result<Vec<StreamEntry>> {
        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("XAUTOCLAIM")
            .arg(&self.stream_key)
            .arg(&self.group_name)
            .arg(consumer)
            .arg(min_idle.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(max_count)
            .query_async(&mut conn)
            .await
            .context("XAUTOCLAIM failed")?;

        // Reply shape: [next cursor, claimed entries, deleted ids].
        let mut parts = items(reply)?.into_iter();
        let _cursor = parts.next();
        match parts.next() {
            Some(entries) => entries_from(entries),
            None => Ok(Vec::new()),
        }
    }

    async fn list_pending(&self, max_count: usize) -> Result<Vec<PendingEntry>> {
        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("XPENDING")
            .arg(&self.stream_key)
            .arg(&self.group_name)
            .arg("-")
            .arg("+")
            .arg(max_count)
            .query_async(&mut conn)
            .await
            .context("XPENDING failed")?;

        let mut pending = Vec::new();
        for row in items(reply)? {
            let mut cols = items(row)?.into_iter();
            let id = cols
                .next()
                .ok_or_else(|| anyhow!("XPENDING row missing id"))?;
            let consumer = cols
                .next()
                .ok_or_else(|| anyhow!("XPENDING row missing consumer"))?;
            let idle = cols
                .next()
                .ok_or_else(|| anyhow!("XPENDING row missing idle time"))?;
            let count = cols
                .next()
                .ok_or_else(|| anyhow!("XPENDING row missing delivery count"))?;
            pending.push(PendingEntry {
                id: string_from(&id)?,
                consumer: string_from(&consumer)?,
                idle_ms: int_from(&idle)?,
                delivery_count: int_from(&count)?,
            });
        }
        Ok(pending)
    }

    async fn group_info(&self) -> Result<Option<GroupInfo>> {
        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("XINFO")
            .arg("GROUPS")
            .arg(&self.stream_key)
            .query_async(&mut conn)
            .await
            .context("XINFO GROUPS failed")?;

        for group in items(reply)? {
            let mut name = None;
            let mut last_delivered = None;
            for (key, value) in pairs(group)? {
                match string_from(&key)?.as_str() {
                    "name" => name = Some(string_from(&value)?),
                    "last-delivered-id" => last_delivered = Some(string_from(&value)?),
                    _ => {}
                }
            }
            if name.as_deref() == Some(self.group_name.as_str()) {
                return Ok(last_delivered.map(|id| GroupInfo {
                    last_delivered_id: id,
                }));
            }
        }
        Ok(None)
    }

    async fn recent_events(&self, max_count: usize) -> Result<Vec<StreamEntry>> {
        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("XREVRANGE")
            .arg(&self.stream_key)
            .arg("+")
            .arg("-")
            .arg("COUNT")
            .arg(max_count)
            .query_async(&mut conn)
            .await
            .context("XREVRANGE failed")?;
        entries_from(reply)
    }
}

// ---------------------------------------------------------------------------
// Reply walking
// ---------------------------------------------------------------------------

fn string_from(value: &Value) -> Result<String> {
    match value {
        Value::BulkString(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Ok(s.clone()),
        Value::Int(n) => Ok(n.to_string()),
        Value::VerbatimString { text, .. } => Ok(text.clone()),
        other => bail!("expected string reply, got {other:?}"),
    }
}

fn int_from(value: &Value) -> Result<u64> {
    match value {
        Value::Int(n) => Ok(*n as u64),
        Value::BulkString(bytes) => Ok(String::from_utf8_lossy(bytes).parse()?),
        other => bail!("expected integer reply, got {other:?}"),
    }
}

fn items(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) | Value::Set(items) => Ok(items),
        Value::Nil => Ok(Vec::new()),
        other => bail!("expected array reply, got {other:?}"),
    }
}

/// Key/value pairs from either a RESP3 map or a RESP2 flat array.
fn pairs(value: Value) -> Result<Vec<(Value, Value)>> {
    match value {
        Value::Map(pairs) => Ok(pairs),
        Value::Array(values) => {
            if values.iter().all(|v| matches!(v, Value::Array(p) if p.len() == 2)) {
                // Array of two-element pairs (XREADGROUP stream list).
                let mut out = Vec::with_capacity(values.len());
                for pair in values {
                    let mut pair = items(pair)?.into_iter();
                    let k = pair.next().ok_or_else(|| anyhow!("missing pair key"))?;
                    let v = pair.next().ok_or_else(|| anyhow!("missing pair value"))?;
                    out.push((k, v));
                }
                Ok(out)
            } else {
                // Flat [k, v, k, v, ...] array (XINFO GROUPS, entry fields).
                if values.len() % 2 != 0 {
                    bail!("flat pair array has odd length {}", values.len());
                }
                let mut out = Vec::with_capacity(values.len() / 2);
                let mut iter = values.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    out.push((k, v));
                }
                Ok(out)
            }
        }
        Value::Nil => Ok(Vec::new()),
        other => bail!("expected map reply, got {other:?}"),
    }
}

fn entry_from(value: Value) -> Result<StreamEntry> {
    let mut parts = items(value)?.into_iter();
    let id = parts
        .next()
        .ok_or_else(|| anyhow!("stream entry missing id"))?;
    let raw_fields = parts
        .next()
        .ok_or_else(|| anyhow!("stream entry missing field list"))?;
    let mut fields = Vec::new();
    for (key, val) in pairs(raw_fields)? {
        fields.push((string_from(&key)?, string_from(&val)?));
    }
    Ok(StreamEntry {
        id: string_from(&id)?,
        fields,
    })
}

fn entries_from(value: Value) -> Result<Vec<StreamEntry>> {
    items(value)?.into_iter().map(entry_from).collect()
}
