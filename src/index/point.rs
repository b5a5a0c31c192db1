//! Ordered point index for numeric fields.
//!
//! Numeric values are encoded into big-endian-comparable byte keys and kept
//! in an ordered map, so exact lookups and range scans both walk keys in
//! value order. A hash map cannot serve range queries, which is why this is
//! a `BTreeMap`.

use std::collections::BTreeMap;
use std::ops::Bound;

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

/// Big-endian encoding of an i64 with the sign bit flipped, so that
/// lexicographic byte order equals numeric order.
pub fn encode_point(value: i64) -> [u8; 8] {
    let mut key = [0u8; 8];
    BigEndian::write_u64(&mut key, (value as u64) ^ (1 << 63));
    key
}

/// Inverse of [`encode_point`].
pub fn decode_point(key: &[u8; 8]) -> i64 {
    (BigEndian::read_u64(key) ^ (1 << 63)) as i64
}

/// Point index over one numeric field of a segment: value key → ascending
/// list of segment-local document ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointIndex {
    points: BTreeMap<[u8; 8], Vec<u32>>,
}

impl PointIndex {
    /// Create a new empty point index.
    pub fn new() -> Self {
        PointIndex {
            points: BTreeMap::new(),
        }
    }

    /// Record that `doc_id` holds `value`. Documents must be added in
    /// ascending id order per value.
    pub fn add(&mut self, value: i64, doc_id: u32) {
        let docs = self.points.entry(encode_point(value)).or_default();
        if docs.last() != Some(&doc_id) {
            docs.push(doc_id);
        }
    }

    /// Document ids holding exactly `value`, ascending.
    pub fn exact(&self, value: i64) -> &[u32] {
        self.points
            .get(&encode_point(value))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Document ids with values in the given range, ascending by id.
    ///
    /// Bounds are optional on both ends; `include_low`/`include_high` select
    /// inclusive or exclusive endpoints.
    pub fn range(
        &self,
        low: Option<i64>,
        high: Option<i64>,
        include_low: bool,
        include_high: bool,
    ) -> Vec<u32> {
        let low_bound = match low {
            Some(v) if include_low => Bound::Included(encode_point(v)),
            Some(v) => Bound::Excluded(encode_point(v)),
            None => Bound::Unbounded,
        };
        let high_bound = match high {
            Some(v) if include_high => Bound::Included(encode_point(v)),
            Some(v) => Bound::Excluded(encode_point(v)),
            None => Bound::Unbounded,
        };

        // An inverted bound range panics in BTreeMap; treat it as empty.
        if let (Some(lo), Some(hi)) = (low, high) {
            if lo > hi || (lo == hi && !(include_low && include_high)) {
                return Vec::new();
            }
        }

        let mut docs: Vec<u32> = self
            .points
            .range((low_bound, high_bound))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        docs.sort_unstable();
        docs.dedup();
        docs
    }

    /// Number of distinct values in the index.
    pub fn value_count(&self) -> usize {
        self.points.len()
    }

    /// Check whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
