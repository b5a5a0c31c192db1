//! Immutable, consistent views of a committed index.

use std::sync::Arc;

use bit_vec::BitVec;

use crate::analysis::PerFieldAnalyzer;
use crate::document::codec::DocumentCodec;
use crate::document::document::Document;
use crate::error::Result;
use crate::index::segment::Segment;
use crate::query::query::Query;
use crate::query::searcher::{SearchHit, Searcher};
use crate::schema::Schema;

/// One segment plus its live-document bitmask.
///
/// The mask records documents deleted after the segment was sealed; the
/// segment itself is never modified.
#[derive(Debug, Clone)]
pub struct SegmentReader {
    segment: Arc<Segment>,
    live: BitVec,
}

impl SegmentReader {
    /// Create a reader over a segment with the given live mask.
    pub fn new(segment: Arc<Segment>, live: BitVec) -> Self {
        debug_assert_eq!(live.len(), segment.doc_count() as usize);
        SegmentReader { segment, live }
    }

    /// Create a reader with every document live.
    pub fn all_live(segment: Arc<Segment>) -> Self {
        let live = BitVec::from_elem(segment.doc_count() as usize, true);
        SegmentReader { segment, live }
    }

    /// The underlying segment.
    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }

    /// Check whether a local document is live.
    pub fn is_live(&self, doc_id: u32) -> bool {
        self.live.get(doc_id as usize).unwrap_or(false)
    }

    /// The live mask.
    pub fn live_mask(&self) -> &BitVec {
        &self.live
    }

    /// Number of live documents.
    pub fn live_count(&self) -> u64 {
        self.live.iter().filter(|&b| b).count() as u64
    }
}

/// A consistent, immutable view of the index at one point in time.
///
/// Snapshots are published atomically by `commit()` and shared through
/// `Arc`; any number of concurrent searches may run against one without
/// locking. A snapshot obtained before a commit stays valid and unchanged
/// for as long as the caller holds it.
#[derive(Debug)]
pub struct Snapshot {
    schema: Arc<Schema>,
    analyzer: Arc<PerFieldAnalyzer>,
    readers: Vec<SegmentReader>,
    /// Global doc-id base of each segment.
    bases: Vec<u64>,
}

impl Snapshot {
    /// Build a snapshot over an ordered sequence of segment readers.
    pub fn new(
        schema: Arc<Schema>,
        analyzer: Arc<PerFieldAnalyzer>,
        readers: Vec<SegmentReader>,
    ) -> Self {
        let mut bases = Vec::with_capacity(readers.len());
        let mut next = 0u64;
        for reader in &readers {
            bases.push(next);
            next += reader.segment().doc_count() as u64;
        }
        Snapshot {
            schema,
            analyzer,
            readers,
            bases,
        }
    }

    /// Create an empty snapshot.
    pub fn empty(schema: Arc<Schema>, analyzer: Arc<PerFieldAnalyzer>) -> Self {
        Snapshot::new(schema, analyzer, Vec::new())
    }

    /// The schema this snapshot was committed under.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The analyzer used at index time.
    pub fn analyzer(&self) -> &Arc<PerFieldAnalyzer> {
        &self.analyzer
    }

    /// The segment readers, in commit order.
    pub fn readers(&self) -> &[SegmentReader] {
        &self.readers
    }

    /// Global doc id of a segment-local document.
    pub fn global_id(&self, segment_index: usize, doc_id: u32) -> u64 {
        self.bases[segment_index] + doc_id as u64
    }

    /// Resolve a global doc id back to (segment index, local id).
    pub fn locate(&self, global_id: u64) -> Option<(usize, u32)> {
        let idx = self.bases.partition_point(|&base| base <= global_id);
        if idx == 0 {
            return None;
        }
        let segment_index = idx - 1;
        let local = global_id - self.bases[segment_index];
        if local < self.readers[segment_index].segment().doc_count() as u64 {
            Some((segment_index, local as u32))
        } else {
            None
        }
    }

    /// Total number of live documents.
    pub fn live_count(&self) -> u64 {
        self.readers.iter().map(|r| r.live_count()).sum()
    }

    /// Retrieve the stored fields of a document as a [`Document`].
    ///
    /// Returns `None` for an unknown or deleted doc id. A stored field
    /// absent from the document is simply missing from the result, never an
    /// error.
    pub fn doc(&self, global_id: u64) -> Result<Option<Document>> {
        let Some((segment_index, local)) = self.locate(global_id) else {
            return Ok(None);
        };
        let reader = &self.readers[segment_index];
        if !reader.is_live(local) {
            return Ok(None);
        }
        let Some(stored) = reader.segment().stored_fields(local) else {
            return Ok(None);
        };
        let encoded = crate::document::codec::EncodedDocument {
            stored: stored.to_vec(),
            ..Default::default()
        };
        Ok(Some(DocumentCodec::decode(&encoded, &self.schema)?))
    }

    /// Evaluate a query and return the top `top_k` hits, ranked by score
    /// descending with ties broken by ascending doc id.
    pub fn search(&self, query: &Query, top_k: usize) -> Result<Vec<SearchHit>> {
        Searcher::new(self).search(query, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::index::segment::SegmentBuilder;
    use crate::schema::FieldSpec;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .add_field(FieldSpec::keyword("k").stored(true))
                .build()
                .unwrap(),
        )
    }

    fn analyzer() -> Arc<PerFieldAnalyzer> {
        Arc::new(PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new())))
    }

    fn segment_with_docs(n: u32) -> Arc<Segment> {
        let mut builder = SegmentBuilder::new();
        let schema = schema();
        let pfa = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new()));
        for i in 0..n {
            let doc = Document::builder().add_keyword("k", format!("v{i}")).build();
            let encoded =
                crate::document::codec::DocumentCodec::encode(&doc, &schema, &pfa).unwrap();
            builder.add_document(&encoded);
        }
        Arc::new(builder.seal())
    }

    #[test]
    fn test_global_id_mapping() {
        let snapshot = Snapshot::new(
            schema(),
            analyzer(),
            vec![
                SegmentReader::all_live(segment_with_docs(3)),
                SegmentReader::all_live(segment_with_docs(2)),
            ],
        );

        assert_eq!(snapshot.global_id(0, 2), 2);
        assert_eq!(snapshot.global_id(1, 0), 3);
        assert_eq!(snapshot.locate(2), Some((0, 2)));
        assert_eq!(snapshot.locate(3), Some((1, 0)));
        assert_eq!(snapshot.locate(4), Some((1, 1)));
        assert_eq!(snapshot.locate(5), None);
    }

    #[test]
    fn test_live_count_with_deletions() {
        let segment = segment_with_docs(3);
        let mut live = BitVec::from_elem(3, true);
        live.set(1, false);
        let snapshot = Snapshot::new(
            schema(),
            analyzer(),
            vec![SegmentReader::new(segment, live)],
        );

        assert_eq!(snapshot.live_count(), 2);
        assert!(snapshot.doc(1).unwrap().is_none());
        let doc = snapshot.doc(2).unwrap().unwrap();
        assert_eq!(doc.get("k").unwrap().as_keyword(), Some("v2"));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::empty(schema(), analyzer());
        assert_eq!(snapshot.live_count(), 0);
        assert!(snapshot.doc(0).unwrap().is_none());
    }
}
