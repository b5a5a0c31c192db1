//! BM25 relevance scoring.

/// Default BM25 term-frequency saturation parameter.
pub const DEFAULT_K1: f32 = 1.2;
/// Default BM25 length-normalization parameter.
pub const DEFAULT_B: f32 = 0.75;

/// A BM25 scorer with fixed parameters.
///
/// Statistics are pooled over the whole index, not per segment, so a
/// document scores the same however commits happened to split the corpus.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Scorer {
    k1: f32,
    b: f32,
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Bm25Scorer::new()
    }
}

impl Bm25Scorer {
    /// Create a scorer with the standard parameters (k1 = 1.2, b = 0.75).
    pub fn new() -> Self {
        Bm25Scorer {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
        }
    }

    /// Create a scorer with explicit parameters.
    pub fn with_params(k1: f32, b: f32) -> Self {
        Bm25Scorer { k1, b }
    }

    /// Inverse document frequency of a term.
    ///
    /// Uses the non-negative formulation `ln(1 + (N - df + 0.5) / (df + 0.5))`,
    /// so rare terms weigh more and no term weighs below zero.
    pub fn idf(&self, doc_count: u64, doc_freq: u64) -> f32 {
        let n = doc_count as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Score one term occurrence in one document.
    ///
    /// `field_length` is the analyzed token count of the field in this
    /// document; `avg_field_length` is the corpus average for the field. A
    /// zero average (unanalyzed fields) disables length normalization.
    pub fn score(&self, term_freq: u32, idf: f32, field_length: u32, avg_field_length: f32) -> f32 {
        let tf = term_freq as f32;
        let norm = if avg_field_length > 0.0 {
            1.0 - self.b + self.b * field_length as f32 / avg_field_length
        } else {
            1.0
        };
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm)
    }
}
