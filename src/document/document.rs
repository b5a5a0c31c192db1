//! Document and field value types.

use serde::{Deserialize, Serialize};

/// A value for a field in a document.
///
/// This is a closed set: every value is checked against the schema's declared
/// field kind at encode time, so dynamic typing never reaches the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// 64-bit integer value for numeric fields.
    Numeric(i64),
    /// Free text for analyzed fields.
    Text(String),
    /// Exact, non-analyzed token.
    Keyword(String),
}

impl FieldValue {
    /// Get the text content if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the keyword content if this is a keyword value.
    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            FieldValue::Keyword(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer content if this is a numeric value.
    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            FieldValue::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// Name of the value's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Numeric(_) => "numeric",
            FieldValue::Text(_) => "text",
            FieldValue::Keyword(_) => "keyword",
        }
    }
}

/// A document is an ordered mapping of field names to values.
///
/// A field name may repeat (multi-valued fields). Documents carry no
/// engine-assigned identity; update and delete target an application-level
/// key field such as `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<(String, FieldValue)>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    /// Create a builder for constructing documents.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    /// Append a field value.
    pub fn add_field<S: Into<String>>(&mut self, name: S, value: FieldValue) {
        self.fields.push((name.into(), value));
    }

    /// Get the first value for a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Get all values for a field, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> {
        self.fields
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// All (name, value) pairs in insertion order.
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Number of field values (counting repeats).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    /// Add a text field value.
    pub fn add_text<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document
            .add_field(name, FieldValue::Text(value.into()));
        self
    }

    /// Add a keyword field value.
    pub fn add_keyword<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document
            .add_field(name, FieldValue::Keyword(value.into()));
        self
    }

    /// Add a numeric field value.
    pub fn add_numeric<S: Into<String>>(mut self, name: S, value: i64) -> Self {
        self.document.add_field(name, FieldValue::Numeric(value));
        self
    }

    /// Build the final document.
    pub fn build(self) -> Document {
        self.document
    }
}
