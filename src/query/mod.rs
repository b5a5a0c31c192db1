//! Query model, parser, and evaluation against snapshots.

pub mod collector;
pub mod parser;
pub mod query;
pub mod scorer;
pub mod searcher;

pub use collector::TopKCollector;
pub use parser::QueryParser;
pub use query::{BooleanQueryBuilder, Occur, Query};
pub use scorer::Bm25Scorer;
pub use searcher::{SearchHit, Searcher};
