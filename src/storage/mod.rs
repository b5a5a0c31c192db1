//! Storage abstraction layer for Tamarix.
//!
//! The index engine only needs an ordered-byte-range-addressable store with
//! sequential append and an atomic rename for snapshot publication. Anything
//! that provides these primitives can back an index.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::{Storage, StorageInput, StorageOutput};
