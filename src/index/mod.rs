//! The inverted index: postings, point indexes, segments, snapshots, and
//! the writer.

pub mod point;
pub mod postings;
pub mod segment;
pub mod snapshot;
pub mod writer;

pub use point::PointIndex;
pub use postings::{Posting, PostingIterator, PostingList, Term};
pub use segment::{Segment, SegmentBuilder};
pub use snapshot::{SegmentReader, Snapshot};
pub use writer::{Index, IndexConfig};
