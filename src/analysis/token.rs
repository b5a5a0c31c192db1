//! Token types for text analysis.

use std::fmt;

/// A token is a single unit of text produced by a tokenizer.
///
/// Positions are 0-based within the token stream and feed the positional
/// postings; offsets are byte offsets into the original text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// The text content of the token.
    pub text: String,
    /// The position of the token in the stream (0-based).
    pub position: u32,
    /// Byte offset where this token starts in the original text.
    pub start_offset: usize,
    /// Byte offset where this token ends in the original text.
    pub end_offset: usize,
    /// Whether a filter marked this token for removal.
    pub stopped: bool,
}

impl Token {
    /// Create a new token with the given text and position.
    pub fn new<S: Into<String>>(text: S, position: u32) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset: 0,
            end_offset: 0,
            stopped: false,
        }
    }

    /// Create a new token with text, position, and byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: u32,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
            stopped: false,
        }
    }

    /// Mark this token as stopped.
    pub fn stop(mut self) -> Self {
        self.stopped = true;
        self
    }

    /// Check if this token is stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A lazy, finite stream of tokens from the analysis pipeline.
pub type TokenStream = Box<dyn Iterator<Item = Token>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("hello", 0);
        assert_eq!(token.text, "hello");
        assert_eq!(token.position, 0);
        assert!(!token.is_stopped());
    }

    #[test]
    fn test_token_with_offsets() {
        let token = Token::with_offsets("world", 1, 6, 11);
        assert_eq!(token.start_offset, 6);
        assert_eq!(token.end_offset, 11);
    }

    #[test]
    fn test_token_stop() {
        let token = Token::new("the", 0).stop();
        assert!(token.is_stopped());
    }
}
