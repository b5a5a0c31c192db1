//! Documents, field values, and the schema-driven document codec.

pub mod codec;
pub mod document;

pub use codec::{DocumentCodec, EncodedDocument};
pub use document::{Document, DocumentBuilder, FieldValue};
