//! Immutable index segments.
//!
//! A segment is one sealed unit of committed state: postings, point indexes,
//! stored values, and field statistics for a closed set of documents.
//! Internal document ids are dense, segment-local, and never reused.

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::document::codec::EncodedDocument;
use crate::document::document::FieldValue;
use crate::error::{Result, TamarixError};
use crate::index::point::PointIndex;
use crate::index::postings::{PostingList, Term};
use crate::storage::{StorageInput, StorageOutput};

/// Magic bytes at the start of a serialized segment.
const SEGMENT_MAGIC: &[u8; 4] = b"TMXS";
/// Current segment format version.
const SEGMENT_VERSION: u32 = 1;

/// An immutable, sealed segment.
///
/// Everything in a segment is read-only after sealing, so concurrent readers
/// need no locking. Deletions are tracked outside the segment in the
/// snapshot's live bitmask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    doc_count: u32,
    postings: BTreeMap<Term, PostingList>,
    points: BTreeMap<String, PointIndex>,
    /// Sortable columnar values: field → per-document value.
    sort_values: BTreeMap<String, Vec<Option<i64>>>,
    /// Stored field values per document.
    stored: Vec<Vec<(String, FieldValue)>>,
    /// Analyzed-field token counts: field → per-document length.
    field_lengths: BTreeMap<String, Vec<u32>>,
}

impl Segment {
    /// Number of documents sealed into this segment (live or not).
    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// The posting list for a term, if any document contains it.
    pub fn postings(&self, term: &Term) -> Option<&PostingList> {
        self.postings.get(term)
    }

    /// The point index for a numeric field, if any document populated it.
    pub fn point_index(&self, field: &str) -> Option<&PointIndex> {
        self.points.get(field)
    }

    /// Stored field values of a document.
    pub fn stored_fields(&self, doc_id: u32) -> Option<&[(String, FieldValue)]> {
        self.stored.get(doc_id as usize).map(Vec::as_slice)
    }

    /// Sortable columnar value of a document, if kept.
    pub fn sort_value(&self, field: &str, doc_id: u32) -> Option<i64> {
        self.sort_values
            .get(field)
            .and_then(|column| column.get(doc_id as usize).copied().flatten())
    }

    /// Analyzed token count of `field` in `doc_id` (0 when absent).
    pub fn field_length(&self, field: &str, doc_id: u32) -> u32 {
        self.field_lengths
            .get(field)
            .and_then(|lengths| lengths.get(doc_id as usize).copied())
            .unwrap_or(0)
    }

    /// Sum of analyzed token counts for `field` across all documents.
    pub fn total_field_length(&self, field: &str) -> u64 {
        self.field_lengths
            .get(field)
            .map(|lengths| lengths.iter().map(|&l| l as u64).sum())
            .unwrap_or(0)
    }

    /// Serialize this segment: magic, version, bincode body, crc32 footer.
    pub fn write_to(&self, output: &mut dyn StorageOutput) -> Result<()> {
        let body = bincode::serialize(self)
            .map_err(|e| TamarixError::storage(format!("segment serialization: {e}")))?;
        let crc = crc32fast::hash(&body);

        output.write_all(SEGMENT_MAGIC)?;
        output.write_all(&SEGMENT_VERSION.to_le_bytes())?;
        output.write_all(&(body.len() as u64).to_le_bytes())?;
        output.write_all(&body)?;
        output.write_all(&crc.to_le_bytes())?;
        Ok(())
    }

    /// Deserialize a segment, verifying magic, version, and checksum.
    pub fn read_from(input: &mut dyn StorageInput) -> Result<Self> {
        let data = input.read_all()?;
        if data.len() < 16 || &data[0..4] != SEGMENT_MAGIC {
            return Err(TamarixError::storage("not a segment file"));
        }
        let version = u32::from_le_bytes(data[4..8].try_into().unwrap());
        if version != SEGMENT_VERSION {
            return Err(TamarixError::storage(format!(
                "unsupported segment version {version}"
            )));
        }
        let body_len = u64::from_le_bytes(data[8..16].try_into().unwrap()) as usize;
        if data.len() != 16 + body_len + 4 {
            return Err(TamarixError::storage("truncated segment file"));
        }
        let body = &data[16..16 + body_len];
        let stored_crc = u32::from_le_bytes(data[16 + body_len..].try_into().unwrap());
        if crc32fast::hash(body) != stored_crc {
            return Err(TamarixError::storage("segment checksum mismatch"));
        }
        bincode::deserialize(body)
            .map_err(|e| TamarixError::storage(format!("segment deserialization: {e}")))
    }
}

/// Accumulates encoded documents and seals them into a [`Segment`].
///
/// Local document ids are assigned densely in insertion order.
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    doc_count: u32,
    postings: BTreeMap<Term, PostingList>,
    points: BTreeMap<String, PointIndex>,
    sort_values: BTreeMap<String, Vec<Option<i64>>>,
    stored: Vec<Vec<(String, FieldValue)>>,
    field_lengths: BTreeMap<String, Vec<u32>>,
}

impl SegmentBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        SegmentBuilder::default()
    }

    /// Number of documents added so far.
    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// Check whether no documents were added.
    pub fn is_empty(&self) -> bool {
        self.doc_count == 0
    }

    /// Add an encoded document, returning its segment-local id.
    pub fn add_document(&mut self, encoded: &EncodedDocument) -> u32 {
        let doc_id = self.doc_count;
        self.doc_count += 1;

        let mut terms: Vec<(&Term, &Vec<u32>)> = encoded.terms.iter().collect();
        // Deterministic postings regardless of hash-map iteration order.
        terms.sort_by_key(|(term, _)| *term);
        for (term, positions) in terms {
            let list = self.postings.entry(term.clone()).or_default();
            for &position in positions {
                list.add_occurrence(doc_id, position);
            }
        }

        for (field, value) in &encoded.points {
            self.points.entry(field.clone()).or_default().add(*value, doc_id);
        }

        for (field, value) in &encoded.sort_values {
            let column = self.sort_values.entry(field.clone()).or_default();
            column.resize(doc_id as usize + 1, None);
            column[doc_id as usize] = Some(*value);
        }

        for (field, &length) in &encoded.field_lengths {
            let lengths = self.field_lengths.entry(field.clone()).or_default();
            lengths.resize(doc_id as usize + 1, 0);
            lengths[doc_id as usize] = length;
        }

        self.stored.push(encoded.stored.clone());
        doc_id
    }

    /// Seal the builder into an immutable segment.
    pub fn seal(mut self) -> Segment {
        let docs = self.doc_count as usize;
        for column in self.sort_values.values_mut() {
            column.resize(docs, None);
        }
        for lengths in self.field_lengths.values_mut() {
            lengths.resize(docs, 0);
        }
        Segment {
            doc_count: self.doc_count,
            postings: self.postings,
            points: self.points,
            sort_values: self.sort_values,
            stored: self.stored,
            field_lengths: self.field_lengths,
        }
    }
}
