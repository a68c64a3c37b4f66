//! Structured ordering for log-assigned stream ids.
//!
//! The log issues ids of the form `<ms>-<seq>`. Comparing them as strings is
//! only correct while both halves happen to have equal digit width, so the
//! board classification parses ids and orders the numeric pair instead.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed `<ms>-<seq>` stream id. Ordered by `(ms, seq)`. The default is
/// `0-0`, the cursor of a group that has delivered nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// Compare two raw id strings in issuance order.
    ///
    /// Unparseable ids are logged and sort before everything, which leaves a
    /// malformed id classified as already-delivered rather than perpetually
    /// waiting.
    pub fn compare_raw(a: &str, b: &str) -> Ordering {
        parse_lenient(a).cmp(&parse_lenient(b))
    }
}

fn parse_lenient(raw: &str) -> StreamId {
    raw.parse().unwrap_or_else(|e| {
        tracing::warn!(error = %e, id = raw, "Unparseable stream id, treating as 0-0");
        StreamId::ZERO
    })
}

impl FromStr for StreamId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ms, seq) = s
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("stream id '{s}' is not of the form <ms>-<seq>"))?;
        Ok(Self {
            ms: ms.parse()?,
            seq: seq.parse()?,
        })
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let id: StreamId = "1700000000000-3".parse().unwrap();
        assert_eq!(id, StreamId::new(1_700_000_000_000, 3));
        assert_eq!(id.to_string(), "1700000000000-3");
    }

    #[test]
    fn orders_by_ms_then_seq() {
        assert!(StreamId::new(5, 0) < StreamId::new(6, 0));
        assert!(StreamId::new(5, 1) < StreamId::new(5, 2));
        assert!(StreamId::new(6, 0) > StreamId::new(5, 99));
    }

    #[test]
    fn numeric_order_beats_string_order() {
        // "9-0" > "10-0" as strings, but 9 < 10 in issuance order.
        assert_eq!(StreamId::compare_raw("9-0", "10-0"), Ordering::Less);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("garbage".parse::<StreamId>().is_err());
        assert!("1700000000000".parse::<StreamId>().is_err());
        assert!("a-b".parse::<StreamId>().is_err());
    }

    #[test]
    fn zero_is_smallest() {
        assert!(StreamId::ZERO < StreamId::new(0, 1));
        assert_eq!("0-0".parse::<StreamId>().unwrap(), StreamId::ZERO);
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(StreamId::default(), StreamId::ZERO);
    }

    #[test]
    fn unparseable_id_compares_as_zero() {
        assert_eq!(StreamId::compare_raw("garbage", "0-0"), Ordering::Equal);
        assert_eq!(StreamId::compare_raw("garbage", "1-0"), Ordering::Less);
    }
}
