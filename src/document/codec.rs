//! Schema-driven encoding of documents into indexable form.

use ahash::AHashMap;

use crate::analysis::PerFieldAnalyzer;
use crate::document::document::{Document, FieldValue};
use crate::error::{Result, TamarixError};
use crate::index::postings::Term;
use crate::schema::{FieldKind, Schema};

/// Gap inserted between the token positions of consecutive values of a
/// multi-valued field, so phrases never match across value boundaries.
const MULTI_VALUE_POSITION_GAP: u32 = 1;

/// The indexable form of one document, produced by [`DocumentCodec::encode`].
///
/// Separates what the index needs: analyzed/keyword terms with positions,
/// numeric point values, sortable columnar values, stored field values, and
/// per-field token counts for scoring.
#[derive(Debug, Clone, Default)]
pub struct EncodedDocument {
    /// Term → occurrence positions, for every indexed text/keyword value.
    pub terms: AHashMap<Term, Vec<u32>>,
    /// (field, value) point entries for indexed numeric fields.
    pub points: Vec<(String, i64)>,
    /// Columnar values for sortable numeric fields.
    pub sort_values: Vec<(String, i64)>,
    /// Stored field values in schema-then-document order.
    pub stored: Vec<(String, FieldValue)>,
    /// Token count per analyzed field, for length normalization.
    pub field_lengths: AHashMap<String, u32>,
}

/// Encodes documents against a schema and decodes stored fields back.
#[derive(Debug)]
pub struct DocumentCodec;

impl DocumentCodec {
    /// Encode a document against `schema`, analyzing text fields with the
    /// per-field analyzer.
    ///
    /// Fails with `SchemaMismatch` if the document references a field absent
    /// from the schema or supplies a value of the wrong kind.
    pub fn encode(
        document: &Document,
        schema: &Schema,
        analyzer: &PerFieldAnalyzer,
    ) -> Result<EncodedDocument> {
        let mut encoded = EncodedDocument::default();

        for (name, value) in document.fields() {
            let spec = schema.expect_field(name)?;

            match (spec.kind, value) {
                (FieldKind::Numeric, FieldValue::Numeric(n)) => {
                    if spec.indexed {
                        encoded.points.push((name.clone(), *n));
                    }
                    if spec.sortable {
                        encoded.sort_values.push((name.clone(), *n));
                    }
                }
                (FieldKind::Text, FieldValue::Text(text)) => {
                    if spec.indexed {
                        if spec.analyzed {
                            Self::encode_analyzed(name, text, analyzer, &mut encoded)?;
                        } else {
                            Self::add_term(&mut encoded, Term::new(name.clone(), text.clone()), 0);
                        }
                    }
                }
                (FieldKind::Keyword, FieldValue::Keyword(token)) => {
                    if spec.indexed {
                        Self::add_term(&mut encoded, Term::new(name.clone(), token.clone()), 0);
                    }
                }
                (kind, value) => {
                    return Err(TamarixError::schema_mismatch(format!(
                        "field '{name}' is declared {} but got a {} value",
                        kind.name(),
                        value.kind_name()
                    )));
                }
            }

            if spec.stored {
                encoded.stored.push((name.clone(), value.clone()));
            }
        }

        Ok(encoded)
    }

    /// Reconstruct a document from its stored fields.
    ///
    /// Only stored fields come back; analyzed text that was not stored is
    /// gone by design.
    pub fn decode(encoded: &EncodedDocument, schema: &Schema) -> Result<Document> {
        let mut document = Document::new();
        for (name, value) in &encoded.stored {
            // Stored values were schema-checked at encode time; a mismatch
            // here means the segment and schema have diverged.
            schema.expect_field(name)?;
            document.add_field(name.clone(), value.clone());
        }
        Ok(document)
    }

    fn encode_analyzed(
        field: &str,
        text: &str,
        analyzer: &PerFieldAnalyzer,
        encoded: &mut EncodedDocument,
    ) -> Result<()> {
        // Offset positions past earlier values of the same field.
        let base = match encoded.field_lengths.get(field) {
            Some(&len) => len + MULTI_VALUE_POSITION_GAP,
            None => 0,
        };

        let mut token_count = 0u32;
        let mut max_position = 0u32;
        for token in analyzer.analyze_field(field, text)? {
            if token.is_stopped() {
                continue;
            }
            let position = base + token.position;
            Self::add_term(
                encoded,
                Term::new(field.to_string(), token.text),
                position,
            );
            token_count += 1;
            max_position = max_position.max(position);
        }

        if token_count > 0 {
            let length = encoded.field_lengths.entry(field.to_string()).or_insert(0);
            *length = (*length).max(max_position + 1);
        }
        Ok(())
    }

    fn add_term(encoded: &mut EncodedDocument, term: Term, position: u32) {
        encoded.terms.entry(term).or_default().push(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::analysis::StandardAnalyzer;
    use crate::schema::FieldSpec;

    fn article_schema() -> Schema {
        Schema::builder()
            .add_field(FieldSpec::numeric("id").stored(true).sortable(true))
            .add_field(FieldSpec::text("title").stored(true))
            .add_field(FieldSpec::keyword("author").stored(true))
            .build()
            .unwrap()
    }

    fn analyzer() -> PerFieldAnalyzer {
        PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new()))
    }

    #[test]
    fn test_encode_separates_terms_points_stored() {
        let schema = article_schema();
        let doc = Document::builder()
            .add_numeric("id", 108)
            .add_text("title", "Data Study")
            .add_keyword("author", "Fly")
            .build();

        let encoded = DocumentCodec::encode(&doc, &schema, &analyzer()).unwrap();

        assert!(encoded.terms.contains_key(&Term::new("title", "data")));
        assert!(encoded.terms.contains_key(&Term::new("title", "study")));
        // Keyword terms are not normalized.
        assert!(encoded.terms.contains_key(&Term::new("author", "Fly")));
        assert_eq!(encoded.points, vec![("id".to_string(), 108)]);
        assert_eq!(encoded.sort_values, vec![("id".to_string(), 108)]);
        assert_eq!(encoded.stored.len(), 3);
        assert_eq!(encoded.field_lengths.get("title"), Some(&2));
    }

    #[test]
    fn test_encode_rejects_unknown_field() {
        let schema = article_schema();
        let doc = Document::builder().add_text("body", "no such field").build();

        match DocumentCodec::encode(&doc, &schema, &analyzer()) {
            Err(TamarixError::SchemaMismatch(_)) => {}
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_rejects_wrong_kind() {
        let schema = article_schema();
        let doc = Document::builder().add_text("id", "not a number").build();

        assert!(matches!(
            DocumentCodec::encode(&doc, &schema, &analyzer()),
            Err(TamarixError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_decode_restores_stored_fields_only() {
        let schema = Schema::builder()
            .add_field(FieldSpec::numeric("id").stored(true))
            .add_field(FieldSpec::text("title").stored(true))
            .add_field(FieldSpec::text("content")) // indexed, not stored
            .build()
            .unwrap();

        let doc = Document::builder()
            .add_numeric("id", 7)
            .add_text("title", "hello world")
            .add_text("content", "only indexed")
            .build();

        let encoded = DocumentCodec::encode(&doc, &schema, &analyzer()).unwrap();
        let decoded = DocumentCodec::decode(&encoded, &schema).unwrap();

        assert_eq!(decoded.get("id").unwrap().as_numeric(), Some(7));
        assert_eq!(decoded.get("title").unwrap().as_text(), Some("hello world"));
        assert!(decoded.get("content").is_none());
    }

    #[test]
    fn test_multi_valued_text_positions_do_not_collide() {
        let schema = Schema::builder()
            .add_field(FieldSpec::text("tag"))
            .build()
            .unwrap();
        let doc = Document::builder()
            .add_text("tag", "alpha beta")
            .add_text("tag", "beta gamma")
            .build();

        let encoded = DocumentCodec::encode(&doc, &schema, &analyzer()).unwrap();
        let beta = &encoded.terms[&Term::new("tag", "beta")];
        assert_eq!(beta.len(), 2);
        assert_ne!(beta[0], beta[1]);
    }
}
