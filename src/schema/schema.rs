//! Schema management for document structure definition.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TamarixError};
use crate::schema::field::{FieldKind, FieldSpec};

/// A schema defines the structure of documents in an index: which fields
/// exist, their kinds, and how each is analyzed, indexed, and stored.
///
/// Field order is preserved so that stored-document reconstruction is
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Field declarations in insertion order.
    fields: Vec<FieldSpec>,
    /// Name to position lookup.
    #[serde(skip)]
    by_name: AHashMap<String, usize>,
}

impl Schema {
    /// Create a builder for constructing schemas.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    fn from_fields(fields: Vec<FieldSpec>) -> Result<Self> {
        let mut by_name = AHashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            field.validate()?;
            if by_name.insert(field.name.clone(), i).is_some() {
                return Err(TamarixError::schema_mismatch(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
        }
        if !fields.iter().any(|f| f.indexed) {
            return Err(TamarixError::schema_mismatch(
                "schema must have at least one indexed field",
            ));
        }
        Ok(Schema { fields, by_name })
    }

    /// Rebuild the lookup map after deserialization.
    pub(crate) fn rebuild_lookup(&mut self) {
        self.by_name = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
    }

    /// Get a field spec by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Get a field spec by name, failing with `SchemaMismatch` if absent.
    pub fn expect_field(&self, name: &str) -> Result<&FieldSpec> {
        self.field(name).ok_or_else(|| {
            TamarixError::schema_mismatch(format!("field '{name}' is not defined in schema"))
        })
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All field specs in insertion order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Names of all indexed fields, in insertion order.
    pub fn indexed_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.indexed)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Names of all stored fields, in insertion order.
    pub fn stored_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.stored)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Names of all analyzed text fields, in insertion order.
    pub fn analyzed_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.analyzed && f.kind == FieldKind::Text)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A builder for constructing schemas in a fluent manner.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Create a new empty schema builder.
    pub fn new() -> Self {
        SchemaBuilder { fields: Vec::new() }
    }

    /// Add a field to the schema being built.
    pub fn add_field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Build the final schema, validating every field and the invariants
    /// across them.
    pub fn build(self) -> Result<Schema> {
        Schema::from_fields(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_schema() -> Schema {
        Schema::builder()
            .add_field(FieldSpec::numeric("id").stored(true).sortable(true))
            .add_field(FieldSpec::text("title").stored(true))
            .add_field(FieldSpec::text("content"))
            .add_field(FieldSpec::keyword("author").stored(true))
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_lookup() {
        let schema = article_schema();

        assert_eq!(schema.len(), 4);
        assert!(schema.has_field("title"));
        assert!(!schema.has_field("missing"));
        assert_eq!(schema.field("id").unwrap().kind, FieldKind::Numeric);
        assert!(schema.expect_field("missing").is_err());
    }

    #[test]
    fn test_schema_field_groups() {
        let schema = article_schema();

        assert_eq!(schema.indexed_fields(), vec!["id", "title", "content", "author"]);
        assert_eq!(schema.stored_fields(), vec!["id", "title", "author"]);
        assert_eq!(schema.analyzed_fields(), vec!["title", "content"]);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Schema::builder()
            .add_field(FieldSpec::text("title"))
            .add_field(FieldSpec::keyword("title"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_without_indexed_field_rejected() {
        let result = Schema::builder()
            .add_field(FieldSpec::text("note").analyzed(false).indexed(false).stored(true))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_serde_round_trip() {
        let schema = article_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let mut restored: Schema = serde_json::from_str(&json).unwrap();
        restored.rebuild_lookup();

        assert_eq!(restored.fields(), schema.fields());
        assert!(restored.has_field("author"));
    }
}
