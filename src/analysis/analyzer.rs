//! Analyzer implementations combining tokenizers and filters.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::filter::{LowercaseFilter, StopFilter, TokenFilter};
use crate::analysis::token::{Token, TokenStream};
use crate::analysis::tokenizer::{CjkBigramTokenizer, Tokenizer, UnicodeTokenizer};
use crate::error::Result;

/// Trait for analyzers that convert raw text into normalized tokens.
///
/// `analyze` is restartable: calling it again with the same input yields an
/// identical, fresh stream. Determinism is required so re-indexing a document
/// reproduces the same terms.
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    /// Analyze the given text into a token stream.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    fn name(&self) -> &'static str;
}

/// An analyzer built from a tokenizer followed by an ordered list of filters.
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn TokenFilter>>,
    name: &'static str,
}

impl PipelineAnalyzer {
    /// Create a pipeline with the given tokenizer and no filters.
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        PipelineAnalyzer {
            tokenizer,
            filters: Vec::new(),
            name: "pipeline",
        }
    }

    /// Append a filter to the pipeline.
    pub fn add_filter(mut self, filter: Arc<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the analyzer name.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl std::fmt::Debug for PipelineAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAnalyzer")
            .field("tokenizer", &self.tokenizer.name())
            .field(
                "filters",
                &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let mut stream = self.tokenizer.tokenize(text)?;
        for filter in &self.filters {
            stream = filter.filter(stream)?;
        }
        Ok(stream)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// The default analyzer for Latin-script text: Unicode word boundaries,
/// lowercasing, English stop-word removal.
#[derive(Debug)]
pub struct StandardAnalyzer {
    inner: PipelineAnalyzer,
}

impl StandardAnalyzer {
    /// Create a new standard analyzer.
    pub fn new() -> Self {
        let inner = PipelineAnalyzer::new(Arc::new(UnicodeTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(StopFilter::new()))
            .with_name("standard");
        StandardAnalyzer { inner }
    }

    /// Create a standard analyzer without stop-word removal.
    pub fn without_stop_words() -> Self {
        let inner = PipelineAnalyzer::new(Arc::new(UnicodeTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .with_name("standard_no_stop");
        StandardAnalyzer { inner }
    }
}

impl Default for StandardAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Analyzer for mixed Latin/CJK text: CJK runs become character bigrams,
/// Latin words are lowercased. No stop-word removal.
#[derive(Debug)]
pub struct CjkAnalyzer {
    inner: PipelineAnalyzer,
}

impl CjkAnalyzer {
    /// Create a new CJK analyzer.
    pub fn new() -> Self {
        let inner = PipelineAnalyzer::new(Arc::new(CjkBigramTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .with_name("cjk");
        CjkAnalyzer { inner }
    }
}

impl Default for CjkAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for CjkAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Analyzer that emits the whole input, trimmed, as a single token.
///
/// A per-field override choice for text fields whose values should match
/// exactly, without tokenization.
#[derive(Clone, Debug, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    /// Create a new keyword analyzer.
    pub fn new() -> Self {
        KeywordAnalyzer
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }
        let token = Token::with_offsets(trimmed, 0, 0, trimmed.len());
        Ok(Box::new(std::iter::once(token)))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// An analyzer that dispatches per field name, with a default for fields
/// without an override. This is how a schema selects CJK analysis for some
/// fields and the standard pipeline for the rest.
pub struct PerFieldAnalyzer {
    default: Arc<dyn Analyzer>,
    overrides: AHashMap<String, Arc<dyn Analyzer>>,
}

impl PerFieldAnalyzer {
    /// Create a per-field analyzer with the given default.
    pub fn new(default: Arc<dyn Analyzer>) -> Self {
        PerFieldAnalyzer {
            default,
            overrides: AHashMap::new(),
        }
    }

    /// Set the analyzer for a specific field.
    pub fn with_field<S: Into<String>>(mut self, field: S, analyzer: Arc<dyn Analyzer>) -> Self {
        self.overrides.insert(field.into(), analyzer);
        self
    }

    /// Get the analyzer used for the given field.
    pub fn for_field(&self, field: &str) -> &Arc<dyn Analyzer> {
        self.overrides.get(field).unwrap_or(&self.default)
    }

    /// Get the default analyzer.
    pub fn default_analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.default
    }

    /// Analyze text as the given field would be analyzed at index time.
    pub fn analyze_field(&self, field: &str, text: &str) -> Result<TokenStream> {
        self.for_field(field).analyze(text)
    }
}

impl std::fmt::Debug for PerFieldAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerFieldAnalyzer")
            .field("default", &self.default.name())
            .field(
                "overrides",
                &self
                    .overrides
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.name()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
