//! Query evaluation against a snapshot.
//!
//! Evaluation runs segment by segment. Each query node produces a
//! doc-ordered list of scored matches for one segment; boolean combinators
//! merge those lists, and the collector ranks the live survivors globally.

use crate::error::{Result, TamarixError};
use crate::index::postings::Term;
use crate::index::snapshot::{SegmentReader, Snapshot};
use crate::query::collector::TopKCollector;
use crate::query::query::{Occur, Query};
use crate::query::scorer::Bm25Scorer;
use crate::schema::FieldKind;

/// One ranked search result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Global document id, valid within the snapshot that produced it.
    pub doc_id: u64,
    /// Relevance score.
    pub score: f32,
}

/// A scored segment-local match. Lists of these are kept doc-ordered.
#[derive(Debug, Clone, Copy)]
struct Scored {
    doc_id: u32,
    score: f32,
}

/// Evaluates queries against one snapshot.
#[derive(Debug)]
pub struct Searcher<'a> {
    snapshot: &'a Snapshot,
    scorer: Bm25Scorer,
}

impl<'a> Searcher<'a> {
    /// Create a searcher over a snapshot.
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Searcher {
            snapshot,
            scorer: Bm25Scorer::new(),
        }
    }

    /// Evaluate `query`, returning at most `top_k` hits ranked by score
    /// descending, ties broken by ascending global doc id.
    pub fn search(&self, query: &Query, top_k: usize) -> Result<Vec<SearchHit>> {
        let mut collector = TopKCollector::new(top_k);
        for (segment_index, reader) in self.snapshot.readers().iter().enumerate() {
            for scored in self.eval(query, reader)? {
                if reader.is_live(scored.doc_id) {
                    let global = self.snapshot.global_id(segment_index, scored.doc_id);
                    collector.collect(global, scored.score);
                }
            }
        }
        Ok(collector.into_sorted_hits())
    }

    /// Global doc ids of every live match, in ascending order.
    ///
    /// Unlike [`search`](Self::search) this has no limit and no ranking; the
    /// writer uses it to resolve deferred deletes.
    pub fn matching(&self, query: &Query) -> Result<Vec<u64>> {
        let mut out = Vec::new();
        for (segment_index, reader) in self.snapshot.readers().iter().enumerate() {
            for scored in self.eval(query, reader)? {
                if reader.is_live(scored.doc_id) {
                    out.push(self.snapshot.global_id(segment_index, scored.doc_id));
                }
            }
        }
        Ok(out)
    }

    /// Total number of documents matching `query` (live only).
    pub fn count(&self, query: &Query) -> Result<u64> {
        let mut total = 0u64;
        for reader in self.snapshot.readers() {
            total += self
                .eval(query, reader)?
                .iter()
                .filter(|s| reader.is_live(s.doc_id))
                .count() as u64;
        }
        Ok(total)
    }

    fn eval(&self, query: &Query, reader: &SegmentReader) -> Result<Vec<Scored>> {
        match query {
            Query::Term { field, value } => self.eval_term(field, value, reader),
            Query::Range {
                field,
                low,
                high,
                include_low,
                include_high,
            } => self.eval_range(field, *low, *high, *include_low, *include_high, reader),
            Query::Boolean { clauses } => self.eval_boolean(clauses, reader),
            Query::MultiField { fields, text } => self.eval_multi_field(fields, text, reader),
            Query::Boost {
                inner,
                boosted,
                factor,
            } => {
                let mut matches = self.eval(inner, reader)?;
                let secondary = self.eval(boosted, reader)?;
                apply_boost(&mut matches, &secondary, *factor);
                Ok(matches)
            }
            Query::MatchAll => {
                let doc_count = reader.segment().doc_count();
                Ok((0..doc_count)
                    .map(|doc_id| Scored { doc_id, score: 1.0 })
                    .collect())
            }
        }
    }

    fn eval_term(&self, field: &str, value: &str, reader: &SegmentReader) -> Result<Vec<Scored>> {
        let spec = self.snapshot.schema().expect_field(field)?;
        match spec.kind {
            FieldKind::Numeric => {
                let point = value.parse::<i64>().map_err(|_| {
                    TamarixError::query_parse(
                        value,
                        0,
                        format!("numeric field '{field}' requires an integer term"),
                    )
                })?;
                Ok(self.eval_range(field, Some(point), Some(point), true, true, reader)?)
            }
            FieldKind::Keyword => Ok(self.eval_single_term(
                &Term::new(field, value),
                reader,
            )),
            FieldKind::Text => {
                if !spec.analyzed {
                    return Ok(self.eval_single_term(&Term::new(field, value), reader));
                }
                // Normalize the query text the same way the field was
                // indexed; multiple tokens OR-combine.
                let analyzer = self.snapshot.analyzer();
                let tokens: Vec<String> = analyzer
                    .analyze_field(field, value)?
                    .filter(|t| !t.is_stopped())
                    .map(|t| t.text)
                    .collect();
                let mut merged = Vec::new();
                for token in tokens {
                    let matches = self.eval_single_term(&Term::new(field, token), reader);
                    merged = union_sum(&merged, &matches);
                }
                Ok(merged)
            }
        }
    }

    fn eval_single_term(&self, term: &Term, reader: &SegmentReader) -> Vec<Scored> {
        let Some(list) = reader.segment().postings(term) else {
            return Vec::new();
        };
        let (doc_count, doc_freq, avg_length) = self.term_stats(term);
        let idf = self.scorer.idf(doc_count, doc_freq);
        list.iter()
            .map(|posting| {
                let length = reader.segment().field_length(&term.field, posting.doc_id);
                Scored {
                    doc_id: posting.doc_id,
                    score: self.scorer.score(posting.term_freq, idf, length, avg_length),
                }
            })
            .collect()
    }

    /// Corpus-wide statistics for a term: (total docs, pooled doc freq,
    /// average analyzed length of the term's field).
    fn term_stats(&self, term: &Term) -> (u64, u64, f32) {
        let mut doc_count = 0u64;
        let mut doc_freq = 0u64;
        let mut total_length = 0u64;
        for reader in self.snapshot.readers() {
            let segment = reader.segment();
            doc_count += segment.doc_count() as u64;
            if let Some(list) = segment.postings(term) {
                doc_freq += list.doc_freq() as u64;
            }
            total_length += segment.total_field_length(&term.field);
        }
        let avg_length = if doc_count > 0 {
            total_length as f32 / doc_count as f32
        } else {
            0.0
        };
        (doc_count, doc_freq, avg_length)
    }

    fn eval_range(
        &self,
        field: &str,
        low: Option<i64>,
        high: Option<i64>,
        include_low: bool,
        include_high: bool,
        reader: &SegmentReader,
    ) -> Result<Vec<Scored>> {
        let spec = self.snapshot.schema().expect_field(field)?;
        if spec.kind != FieldKind::Numeric {
            return Err(TamarixError::unsupported_field_kind(format!(
                "range query on field '{field}' requires a numeric field, got {}",
                spec.kind.name()
            )));
        }
        let Some(points) = reader.segment().point_index(field) else {
            return Ok(Vec::new());
        };
        Ok(points
            .range(low, high, include_low, include_high)
            .into_iter()
            .map(|doc_id| Scored { doc_id, score: 1.0 })
            .collect())
    }

    fn eval_boolean(
        &self,
        clauses: &[(Query, Occur)],
        reader: &SegmentReader,
    ) -> Result<Vec<Scored>> {
        let mut musts: Option<Vec<Scored>> = None;
        let mut shoulds: Option<Vec<Scored>> = None;
        let mut must_nots: Vec<Vec<Scored>> = Vec::new();

        for (clause, occur) in clauses {
            let matches = self.eval(clause, reader)?;
            match occur {
                Occur::Must => {
                    musts = Some(match musts {
                        Some(acc) => intersect_sum(&acc, &matches),
                        None => matches,
                    });
                }
                Occur::Should => {
                    shoulds = Some(match shoulds {
                        Some(acc) => union_sum(&acc, &matches),
                        None => matches,
                    });
                }
                Occur::MustNot => must_nots.push(matches),
            }
        }

        // With MUST clauses the SHOULD matches only contribute score; alone,
        // they define the result set.
        let mut result = match (musts, shoulds) {
            (Some(musts), Some(shoulds)) => add_optional(&musts, &shoulds),
            (Some(musts), None) => musts,
            (None, Some(shoulds)) => shoulds,
            (None, None) if must_nots.is_empty() => Vec::new(),
            // Pure negation evaluates against the whole document universe.
            (None, None) => {
                let doc_count = reader.segment().doc_count();
                (0..doc_count)
                    .map(|doc_id| Scored { doc_id, score: 1.0 })
                    .collect()
            }
        };

        for excluded in &must_nots {
            result = difference(&result, excluded);
        }
        Ok(result)
    }

    fn eval_multi_field(
        &self,
        fields: &[String],
        text: &str,
        reader: &SegmentReader,
    ) -> Result<Vec<Scored>> {
        // One analysis pass shared by all fields.
        let tokens: Vec<String> = self
            .snapshot
            .analyzer()
            .default_analyzer()
            .analyze(text)?
            .filter(|t| !t.is_stopped())
            .map(|t| t.text)
            .collect();

        let mut merged = Vec::new();
        for field in fields {
            self.snapshot.schema().expect_field(field)?;
            for token in &tokens {
                let matches = self.eval_single_term(&Term::new(field.clone(), token.clone()), reader);
                merged = union_sum(&merged, &matches);
            }
        }
        Ok(merged)
    }
}

/// Merge two doc-ordered lists, keeping docs present in both and summing
/// their scores.
fn intersect_sum(a: &[Scored], b: &[Scored]) -> Vec<Scored> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(Scored {
                    doc_id: a[i].doc_id,
                    score: a[i].score + b[j].score,
                });
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Merge two doc-ordered lists, keeping docs present in either and summing
/// the scores of docs present in both.
fn union_sum(a: &[Scored], b: &[Scored]) -> Vec<Scored> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(Scored {
                    doc_id: a[i].doc_id,
                    score: a[i].score + b[j].score,
                });
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Keep docs of `a` absent from `b`.
fn difference(a: &[Scored], b: &[Scored]) -> Vec<Scored> {
    let mut out = Vec::with_capacity(a.len());
    let mut j = 0;
    for &scored in a {
        while j < b.len() && b[j].doc_id < scored.doc_id {
            j += 1;
        }
        if j >= b.len() || b[j].doc_id != scored.doc_id {
            out.push(scored);
        }
    }
    out
}

/// Add the scores of `optional` to matching docs of `required` without
/// widening the result set.
fn add_optional(required: &[Scored], optional: &[Scored]) -> Vec<Scored> {
    let mut out = Vec::with_capacity(required.len());
    let mut j = 0;
    for &scored in required {
        while j < optional.len() && optional[j].doc_id < scored.doc_id {
            j += 1;
        }
        if j < optional.len() && optional[j].doc_id == scored.doc_id {
            out.push(Scored {
                doc_id: scored.doc_id,
                score: scored.score + optional[j].score,
            });
        } else {
            out.push(scored);
        }
    }
    out
}

/// Multiply the score of every doc in `matches` also present in `secondary`.
fn apply_boost(matches: &mut [Scored], secondary: &[Scored], factor: f32) {
    let mut j = 0;
    for scored in matches.iter_mut() {
        while j < secondary.len() && secondary[j].doc_id < scored.doc_id {
            j += 1;
        }
        if j < secondary.len() && secondary[j].doc_id == scored.doc_id {
            scored.score *= factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::analysis::{PerFieldAnalyzer, StandardAnalyzer};
    use crate::document::codec::DocumentCodec;
    use crate::document::document::Document;
    use crate::index::segment::SegmentBuilder;
    use crate::schema::{FieldSpec, Schema};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .add_field(FieldSpec::numeric("id").stored(true).sortable(true))
                .add_field(FieldSpec::text("title").stored(true))
                .add_field(FieldSpec::keyword("author").stored(true))
                .build()
                .unwrap(),
        )
    }

    fn analyzer() -> Arc<PerFieldAnalyzer> {
        Arc::new(PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new())))
    }

    fn snapshot() -> Snapshot {
        let schema = schema();
        let analyzer = analyzer();
        let mut builder = SegmentBuilder::new();
        for (id, title, author) in [
            (100, "data structures", "Fly"),
            (105, "the study of data", "WD"),
            (106, "study habits", "Fly"),
            (107, "cooking", "WD"),
            (108, "data data data", "Fly"),
        ] {
            let doc = Document::builder()
                .add_numeric("id", id)
                .add_text("title", title)
                .add_keyword("author", author)
                .build();
            let encoded = DocumentCodec::encode(&doc, &schema, &analyzer).unwrap();
            builder.add_document(&encoded);
        }
        Snapshot::new(
            schema,
            analyzer,
            vec![SegmentReader::all_live(Arc::new(builder.seal()))],
        )
    }

    fn ids(hits: &[SearchHit]) -> Vec<u64> {
        hits.iter().map(|h| h.doc_id).collect()
    }

    #[test]
    fn test_keyword_term() {
        let snapshot = snapshot();
        let hits = snapshot.search(&Query::term("author", "Fly"), 10).unwrap();
        assert_eq!(ids(&hits), vec![0, 2, 4]);
    }

    #[test]
    fn test_analyzed_term_normalizes_case() {
        let snapshot = snapshot();
        let hits = snapshot.search(&Query::term("title", "DATA"), 10).unwrap();
        // Repetition ranks doc 4 first.
        assert_eq!(hits[0].doc_id, 4);
        let mut sorted = ids(&hits);
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 4]);
    }

    #[test]
    fn test_numeric_term_is_exact_point_match() {
        let snapshot = snapshot();
        let hits = snapshot.search(&Query::term("id", "106"), 10).unwrap();
        assert_eq!(ids(&hits), vec![2]);
        assert!(snapshot.search(&Query::term("id", "abc"), 10).is_err());
    }

    #[test]
    fn test_range_inclusive_exclusive() {
        let snapshot = snapshot();
        let hits = snapshot
            .search(&Query::range("id", Some(105), Some(108), true, true), 10)
            .unwrap();
        assert_eq!(ids(&hits), vec![1, 2, 3, 4]);

        let hits = snapshot
            .search(&Query::range("id", Some(105), Some(108), false, false), 10)
            .unwrap();
        assert_eq!(ids(&hits), vec![2, 3]);
    }

    #[test]
    fn test_range_on_text_field_fails() {
        let snapshot = snapshot();
        let result = snapshot.search(&Query::range("title", Some(0), None, true, true), 10);
        assert!(matches!(
            result,
            Err(TamarixError::UnsupportedFieldKind(_))
        ));
    }

    #[test]
    fn test_boolean_must_and_must_not() {
        let snapshot = snapshot();
        let query = Query::boolean()
            .must(Query::term("title", "data"))
            .must_not(Query::term("author", "WD"))
            .build();
        let hits = snapshot.search(&query, 10).unwrap();
        assert_eq!(ids(&hits).iter().copied().collect::<std::collections::BTreeSet<_>>(),
            [0u64, 4].into_iter().collect());
    }

    #[test]
    fn test_should_widens_and_ranks() {
        let snapshot = snapshot();
        let query = Query::boolean()
            .should(Query::term("title", "study"))
            .should(Query::term("title", "cooking"))
            .build();
        let hits = snapshot.search(&query, 10).unwrap();
        let mut sorted = ids(&hits);
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3]);
    }

    #[test]
    fn test_should_contributes_score_only_with_must() {
        let snapshot = snapshot();
        let query = Query::boolean()
            .must(Query::term("author", "Fly"))
            .should(Query::term("title", "study"))
            .build();
        let hits = snapshot.search(&query, 10).unwrap();
        // Result set is exactly the Fly docs; doc 2 matched the optional
        // clause and ranks first.
        let mut sorted = ids(&hits);
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 2, 4]);
        assert_eq!(hits[0].doc_id, 2);
    }

    #[test]
    fn test_pure_negation_matches_the_rest() {
        let snapshot = snapshot();
        let query = Query::boolean()
            .must_not(Query::term("author", "Fly"))
            .build();
        let hits = snapshot.search(&query, 10).unwrap();
        assert_eq!(ids(&hits), vec![1, 3]);
    }

    #[test]
    fn test_match_all() {
        let snapshot = snapshot();
        let hits = snapshot.search(&Query::match_all(), 10).unwrap();
        assert_eq!(ids(&hits), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_boost_reorders_without_restricting() {
        let snapshot = snapshot();
        let base = Query::term("title", "data");
        let plain = snapshot.search(&base.clone(), 10).unwrap();

        let boosted = Query::boost(base, Query::term("author", "WD"), 10.0);
        let hits = snapshot.search(&boosted, 10).unwrap();

        assert_eq!(hits.len(), plain.len());
        // Doc 1 is the only WD match and now ranks first.
        assert_eq!(hits[0].doc_id, 1);
    }

    #[test]
    fn test_multi_field() {
        let snapshot = snapshot();
        let query = Query::multi_field(["title", "author"], "study");
        let hits = snapshot.search(&query, 10).unwrap();
        let mut sorted = ids(&hits);
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2]);
    }

    #[test]
    fn test_unknown_field_is_schema_mismatch() {
        let snapshot = snapshot();
        assert!(matches!(
            snapshot.search(&Query::term("nope", "x"), 10),
            Err(TamarixError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_top_k_truncates() {
        let snapshot = snapshot();
        let hits = snapshot.search(&Query::match_all(), 2).unwrap();
        assert_eq!(ids(&hits), vec![0, 1]);
    }

    #[test]
    fn test_deleted_docs_never_match() {
        let schema = schema();
        let analyzer = analyzer();
        let mut builder = SegmentBuilder::new();
        for id in [1i64, 2, 3] {
            let doc = Document::builder()
                .add_numeric("id", id)
                .add_keyword("author", "Fly")
                .build();
            let encoded = DocumentCodec::encode(&doc, &schema, &analyzer).unwrap();
            builder.add_document(&encoded);
        }
        let segment = Arc::new(builder.seal());
        let mut live = bit_vec::BitVec::from_elem(3, true);
        live.set(1, false);
        let snapshot = Snapshot::new(schema, analyzer, vec![SegmentReader::new(segment, live)]);

        let hits = snapshot.search(&Query::term("author", "Fly"), 10).unwrap();
        assert_eq!(ids(&hits), vec![0, 2]);
    }
}
