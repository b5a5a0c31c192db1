//! # Tamarix
//!
//! An embeddable full-text document index for Rust.
//!
//! ## Features
//!
//! - Schema-driven documents with text, keyword, and numeric fields
//! - Flexible text analysis pipeline, including CJK bigram segmentation
//! - Immutable segments with lock-free snapshot readers
//! - Add, update-by-key, and delete-by-query with atomic commits
//! - Term, boolean, numeric-range, multi-field, and boosted queries
//! - BM25 scoring with deterministic ranking
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tamarix::document::Document;
//! use tamarix::index::{Index, IndexConfig};
//! use tamarix::query::Query;
//! use tamarix::schema::{FieldSpec, Schema};
//! use tamarix::storage::MemoryStorage;
//!
//! # fn main() -> tamarix::error::Result<()> {
//! let schema = Schema::builder()
//!     .add_field(FieldSpec::numeric("id").stored(true))
//!     .add_field(FieldSpec::text("title").stored(true))
//!     .add_field(FieldSpec::keyword("author").stored(true))
//!     .build()?;
//!
//! let index = Index::open_or_create(schema, Arc::new(MemoryStorage::new()), IndexConfig::new())?;
//! index.add(
//!     Document::builder()
//!         .add_numeric("id", 108)
//!         .add_text("title", "data study")
//!         .add_keyword("author", "Fly")
//!         .build(),
//! )?;
//! index.commit()?;
//!
//! let snapshot = index.open_snapshot();
//! let hits = snapshot.search(&Query::term("author", "Fly"), 10)?;
//! assert_eq!(hits.len(), 1);
//! # index.close()?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod schema;
pub mod storage;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
