//! Text analysis pipeline: tokenization, filtering, and analyzers.
//!
//! An [`Analyzer`](analyzer::Analyzer) turns raw field text into a lazy,
//! finite sequence of normalized tokens. Analysis is deterministic: the same
//! input always yields the same token sequence, which re-indexing relies on.

pub mod analyzer;
pub mod filter;
pub mod token;
pub mod tokenizer;

pub use analyzer::{
    Analyzer, CjkAnalyzer, KeywordAnalyzer, PerFieldAnalyzer, PipelineAnalyzer, StandardAnalyzer,
};
pub use filter::{LowercaseFilter, StopFilter, TokenFilter};
pub use token::{Token, TokenStream};
pub use tokenizer::{CjkBigramTokenizer, Tokenizer, UnicodeTokenizer};
