//! Token filter implementations.
//!
//! Filters transform or drop tokens after tokenization. Normalization
//! (case-folding, stop-word removal) happens here, not in the index.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// Default English stop words, filtered out during analysis.
const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

static ENGLISH_STOP_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| DEFAULT_ENGLISH_STOP_WORDS.iter().copied().collect());

/// Trait for filters that transform a token stream.
pub trait TokenFilter: Send + Sync + std::fmt::Debug {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter.
    fn name(&self) -> &'static str;
}

/// A filter that lowercases token text for case-insensitive matching.
#[derive(Clone, Debug, Default)]
pub struct LowercaseFilter;

impl LowercaseFilter {
    /// Create a new lowercase filter.
    pub fn new() -> Self {
        LowercaseFilter
    }
}

impl TokenFilter for LowercaseFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let filtered = tokens.map(|mut token| {
            if !token.is_stopped() && token.text.chars().any(|c| c.is_uppercase()) {
                token.text = token.text.to_lowercase();
            }
            token
        });
        Ok(Box::new(filtered))
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }
}

/// A filter that removes stop words from the stream.
///
/// Removed tokens are dropped entirely; remaining tokens keep their original
/// positions so phrase gaps stay observable.
#[derive(Clone, Debug)]
pub struct StopFilter {
    words: HashSet<String>,
}

impl StopFilter {
    /// Create a stop filter with the default English word list.
    pub fn new() -> Self {
        StopFilter {
            words: ENGLISH_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a stop filter with a custom word list.
    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopFilter {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of stop words configured.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the stop list is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenFilter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let words = self.words.clone();
        let filtered = tokens.filter(move |token| !words.contains(&token.text));
        Ok(Box::new(filtered))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(words: &[&str]) -> TokenStream {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i as u32))
            .collect();
        Box::new(tokens.into_iter())
    }

    #[test]
    fn test_lowercase_filter() {
        let filter = LowercaseFilter::new();
        let result: Vec<Token> = filter
            .filter(stream(&["Hello", "WORLD", "already"]))
            .unwrap()
            .collect();

        assert_eq!(result[0].text, "hello");
        assert_eq!(result[1].text, "world");
        assert_eq!(result[2].text, "already");
    }

    #[test]
    fn test_stop_filter_default_list() {
        let filter = StopFilter::new();
        let result: Vec<Token> = filter
            .filter(stream(&["the", "quick", "brown", "and", "lazy"]))
            .unwrap()
            .collect();

        let texts: Vec<&str> = result.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["quick", "brown", "lazy"]);
        // Positions are preserved, not renumbered.
        assert_eq!(result[0].position, 1);
        assert_eq!(result[2].position, 4);
    }

    #[test]
    fn test_stop_filter_custom_words() {
        let filter = StopFilter::with_words(["foo"]);
        let result: Vec<Token> = filter.filter(stream(&["foo", "bar"])).unwrap().collect();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "bar");
    }
}
