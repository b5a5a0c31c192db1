//! Top-k hit collection.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::query::searcher::SearchHit;

/// Heap entry ordered by "goodness": higher score first, then lower doc id.
#[derive(Debug, Clone, Copy)]
struct Entry {
    score: f32,
    doc_id: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

/// Keeps the best `k` hits seen so far.
///
/// Uses a bounded min-heap, so collecting is O(log k) per candidate. Ranking
/// is deterministic: score descending, ties broken by ascending doc id.
#[derive(Debug)]
pub struct TopKCollector {
    limit: usize,
    heap: BinaryHeap<std::cmp::Reverse<Entry>>,
}

impl TopKCollector {
    /// Create a collector keeping at most `limit` hits.
    pub fn new(limit: usize) -> Self {
        TopKCollector {
            limit,
            heap: BinaryHeap::with_capacity(limit.min(1024)),
        }
    }

    /// Offer one candidate hit.
    pub fn collect(&mut self, doc_id: u64, score: f32) {
        if self.limit == 0 {
            return;
        }
        let entry = Entry { score, doc_id };
        if self.heap.len() < self.limit {
            self.heap.push(std::cmp::Reverse(entry));
        } else if let Some(worst) = self.heap.peek() {
            if entry > worst.0 {
                self.heap.pop();
                self.heap.push(std::cmp::Reverse(entry));
            }
        }
    }

    /// Number of hits currently held.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Consume the collector, returning hits in rank order.
    pub fn into_sorted_hits(self) -> Vec<SearchHit> {
        let mut entries: Vec<Entry> = self.heap.into_iter().map(|r| r.0).collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries
            .into_iter()
            .map(|e| SearchHit {
                doc_id: e.doc_id,
                score: e.score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_only_top_k() {
        let mut collector = TopKCollector::new(2);
        collector.collect(0, 1.0);
        collector.collect(1, 3.0);
        collector.collect(2, 2.0);

        let hits = collector.into_sorted_hits();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, 1);
        assert_eq!(hits[1].doc_id, 2);
    }

    #[test]
    fn test_ties_break_by_ascending_doc_id() {
        let mut collector = TopKCollector::new(3);
        collector.collect(9, 1.5);
        collector.collect(3, 1.5);
        collector.collect(7, 1.5);

        let ids: Vec<u64> = collector.into_sorted_hits().iter().map(|h| h.doc_id).collect();
        assert_eq!(ids, vec![3, 7, 9]);
    }

    #[test]
    fn test_tied_candidate_does_not_evict_lower_doc_id() {
        let mut collector = TopKCollector::new(1);
        collector.collect(2, 1.0);
        collector.collect(5, 1.0);

        let hits = collector.into_sorted_hits();
        assert_eq!(hits[0].doc_id, 2);
    }

    #[test]
    fn test_zero_limit() {
        let mut collector = TopKCollector::new(0);
        collector.collect(0, 1.0);
        assert!(collector.is_empty());
        assert!(collector.into_sorted_hits().is_empty());
    }
}
