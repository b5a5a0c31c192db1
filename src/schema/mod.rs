//! Schema definition: field kinds, per-field options, and document structure.

pub mod field;
pub mod schema;

pub use field::{FieldKind, FieldSpec};
pub use schema::{Schema, SchemaBuilder};
