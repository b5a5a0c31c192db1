//! Field kinds and per-field indexing options.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TamarixError};

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// 64-bit signed integer, indexed into the point structures for exact
    /// and range queries. Never analyzed.
    Numeric,
    /// Free text, run through an analyzer when `analyzed` is set.
    Text,
    /// A single exact token, indexed verbatim.
    Keyword,
}

impl FieldKind {
    /// Human-readable name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Numeric => "numeric",
            FieldKind::Text => "text",
            FieldKind::Keyword => "keyword",
        }
    }
}

/// Declaration of a single field: its name, kind, and storage/indexing
/// options.
///
/// Constructed through the kind-specific constructors and builder-style
/// setters:
///
/// ```
/// use tamarix::schema::FieldSpec;
///
/// let title = FieldSpec::text("title").stored(true);
/// assert!(title.analyzed);
/// assert!(title.indexed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within a schema.
    pub name: String,
    /// Value kind.
    pub kind: FieldKind,
    /// Whether text is run through the analysis pipeline. Implies `indexed`.
    pub analyzed: bool,
    /// Whether the original value is stored for retrieval.
    pub stored: bool,
    /// Whether the field participates in the inverted index / point index.
    pub indexed: bool,
    /// Whether a columnar sortable value is kept (numeric fields only).
    pub sortable: bool,
}

impl FieldSpec {
    /// Create an analyzed, indexed text field.
    pub fn text<S: Into<String>>(name: S) -> Self {
        FieldSpec {
            name: name.into(),
            kind: FieldKind::Text,
            analyzed: true,
            stored: false,
            indexed: true,
            sortable: false,
        }
    }

    /// Create an indexed keyword field (exact token, never analyzed).
    pub fn keyword<S: Into<String>>(name: S) -> Self {
        FieldSpec {
            name: name.into(),
            kind: FieldKind::Keyword,
            analyzed: false,
            stored: false,
            indexed: true,
            sortable: false,
        }
    }

    /// Create an indexed numeric field.
    pub fn numeric<S: Into<String>>(name: S) -> Self {
        FieldSpec {
            name: name.into(),
            kind: FieldKind::Numeric,
            analyzed: false,
            stored: false,
            indexed: true,
            sortable: false,
        }
    }

    /// Set whether the original value is stored.
    pub fn stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }

    /// Set whether the field is indexed.
    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    /// Set whether the field is analyzed.
    pub fn analyzed(mut self, analyzed: bool) -> Self {
        self.analyzed = analyzed;
        self
    }

    /// Set whether a sortable columnar value is kept.
    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    /// Validate the option combination for this field.
    ///
    /// Invariants: numeric fields are never analyzed; analyzed implies
    /// indexed; names are non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(TamarixError::schema_mismatch("field name cannot be empty"));
        }
        if self.kind == FieldKind::Numeric && self.analyzed {
            return Err(TamarixError::schema_mismatch(format!(
                "numeric field '{}' cannot be analyzed",
                self.name
            )));
        }
        if self.analyzed && !self.indexed {
            return Err(TamarixError::schema_mismatch(format!(
                "analyzed field '{}' must be indexed",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_constructors() {
        let title = FieldSpec::text("title").stored(true);
        assert_eq!(title.kind, FieldKind::Text);
        assert!(title.analyzed);
        assert!(title.indexed);
        assert!(title.stored);

        let author = FieldSpec::keyword("author");
        assert_eq!(author.kind, FieldKind::Keyword);
        assert!(!author.analyzed);
        assert!(author.indexed);

        let id = FieldSpec::numeric("id").sortable(true);
        assert_eq!(id.kind, FieldKind::Numeric);
        assert!(id.sortable);
    }

    #[test]
    fn test_validate_rejects_analyzed_numeric() {
        let spec = FieldSpec::numeric("id").analyzed(true);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_analyzed_unindexed() {
        let spec = FieldSpec::text("body").indexed(false);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let spec = FieldSpec::keyword("");
        assert!(spec.validate().is_err());
    }
}
