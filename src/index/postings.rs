//! Terms and postings: the core inverted-index structures.

use serde::{Deserialize, Serialize};

/// A term is a (field, normalized token) pair, the atomic unit of the
/// inverted index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term {
    /// Field name.
    pub field: String,
    /// Normalized token text.
    pub text: String,
}

impl Term {
    /// Create a new term.
    pub fn new<F, T>(field: F, text: T) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

/// One document's occurrences of a term within a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Segment-local document id.
    pub doc_id: u32,
    /// Number of occurrences of the term in the document's field.
    pub term_freq: u32,
    /// Token positions of each occurrence.
    pub positions: Vec<u32>,
}

/// The postings for one term, ordered by document id ascending.
///
/// The ordering invariant is what makes merge-based boolean evaluation work,
/// so it is enforced at insertion time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    /// Create a new empty posting list.
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    /// Append an occurrence of the term in `doc_id` at `position`.
    ///
    /// Documents must be added in ascending id order; repeated calls for the
    /// same document accumulate into one posting.
    pub fn add_occurrence(&mut self, doc_id: u32, position: u32) {
        match self.postings.last_mut() {
            Some(last) if last.doc_id == doc_id => {
                last.term_freq += 1;
                last.positions.push(position);
            }
            Some(last) => {
                debug_assert!(last.doc_id < doc_id, "postings must be doc-ordered");
                self.postings.push(Posting {
                    doc_id,
                    term_freq: 1,
                    positions: vec![position],
                });
            }
            None => {
                self.postings.push(Posting {
                    doc_id,
                    term_freq: 1,
                    positions: vec![position],
                });
            }
        }
    }

    /// Number of documents containing the term.
    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    /// The postings, ordered by document id ascending.
    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Iterate over the postings.
    pub fn iter(&self) -> PostingIterator<'_> {
        PostingIterator {
            postings: &self.postings,
            index: 0,
        }
    }

    /// Check whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

/// A cursor over a doc-ordered posting list supporting merge iteration.
#[derive(Debug)]
pub struct PostingIterator<'a> {
    postings: &'a [Posting],
    index: usize,
}

impl<'a> PostingIterator<'a> {
    /// The posting at the cursor, or `None` if exhausted.
    pub fn current(&self) -> Option<&'a Posting> {
        self.postings.get(self.index)
    }

    /// Advance to the next posting.
    pub fn advance(&mut self) -> Option<&'a Posting> {
        if self.index < self.postings.len() {
            self.index += 1;
        }
        self.current()
    }

    /// Skip forward to the first posting with `doc_id >= target`.
    pub fn skip_to(&mut self, target: u32) -> Option<&'a Posting> {
        let rest = &self.postings[self.index.min(self.postings.len())..];
        self.index += rest.partition_point(|p| p.doc_id < target);
        self.current()
    }
}

impl<'a> Iterator for PostingIterator<'a> {
    type Item = &'a Posting;

    fn next(&mut self) -> Option<&'a Posting> {
        let item = self.current();
        if item.is_some() {
            self.index += 1;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list() -> PostingList {
        let mut list = PostingList::new();
        list.add_occurrence(0, 0);
        list.add_occurrence(0, 3);
        list.add_occurrence(2, 1);
        list.add_occurrence(5, 0);
        list
    }

    #[test]
    fn test_occurrences_accumulate_per_doc() {
        let list = sample_list();

        assert_eq!(list.doc_freq(), 3);
        let first = &list.postings()[0];
        assert_eq!(first.doc_id, 0);
        assert_eq!(first.term_freq, 2);
        assert_eq!(first.positions, vec![0, 3]);
    }

    #[test]
    fn test_postings_are_doc_ordered() {
        let list = sample_list();
        let ids: Vec<u32> = list.postings().iter().map(|p| p.doc_id).collect();
        assert_eq!(ids, vec![0, 2, 5]);
    }

    #[test]
    fn test_iterator_skip_to() {
        let list = sample_list();
        let mut iter = list.iter();

        assert_eq!(iter.skip_to(1).unwrap().doc_id, 2);
        // skip_to never moves backwards.
        assert_eq!(iter.skip_to(0).unwrap().doc_id, 2);
        assert_eq!(iter.skip_to(3).unwrap().doc_id, 5);
        assert!(iter.skip_to(6).is_none());
    }

    #[test]
    fn test_iterator_exhaustion() {
        let list = sample_list();
        let ids: Vec<u32> = list.iter().map(|p| p.doc_id).collect();
        assert_eq!(ids, vec![0, 2, 5]);
    }

    #[test]
    fn test_term_display() {
        let term = Term::new("author", "fly");
        assert_eq!(term.to_string(), "author:fly");
    }
}
