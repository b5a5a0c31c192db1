//! Tokenizer implementations.
//!
//! Tokenizers are the first stage of the analysis pipeline. Two strategies
//! are provided: Unicode word boundaries for scripts that separate words
//! with whitespace or punctuation, and character bigrams for CJK runs where
//! no such boundaries exist.

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync + std::fmt::Debug {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer.
    fn name(&self) -> &'static str;
}

/// A tokenizer that splits text on Unicode word boundaries.
///
/// Punctuation and whitespace segments are discarded; everything the word
/// segmenter classifies as a word (including numbers) becomes a token.
#[derive(Clone, Debug, Default)]
pub struct UnicodeTokenizer;

impl UnicodeTokenizer {
    /// Create a new unicode word tokenizer.
    pub fn new() -> Self {
        UnicodeTokenizer
    }
}

impl Tokenizer for UnicodeTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let tokens: Vec<Token> = text
            .unicode_word_indices()
            .enumerate()
            .map(|(position, (offset, word))| {
                Token::with_offsets(word, position as u32, offset, offset + word.len())
            })
            .collect();
        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "unicode"
    }
}

/// A tokenizer for mixed Latin/CJK text.
///
/// Runs of CJK characters are segmented into overlapping character bigrams
/// (a single isolated character becomes a unigram), while runs of other
/// alphanumeric characters are kept as whole words. This is the n-gram
/// fallback for scripts without whitespace word boundaries; a
/// dictionary-based segmenter can be plugged in through the [`Tokenizer`]
/// trait instead.
#[derive(Clone, Debug, Default)]
pub struct CjkBigramTokenizer;

impl CjkBigramTokenizer {
    /// Create a new CJK bigram tokenizer.
    pub fn new() -> Self {
        CjkBigramTokenizer
    }

    fn is_cjk(c: char) -> bool {
        matches!(c,
            '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
            | '\u{3400}'..='\u{4DBF}' // CJK Extension A
            | '\u{3040}'..='\u{309F}' // Hiragana
            | '\u{30A0}'..='\u{30FF}' // Katakana
            | '\u{AC00}'..='\u{D7AF}' // Hangul
        )
    }
}

/// Accumulates tokens while scanning, tracking the current CJK or word run.
struct RunScanner<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    position: u32,
    cjk_run: Vec<(usize, char)>,
    word_start: Option<usize>,
    word_end: usize,
}

impl<'a> RunScanner<'a> {
    fn new(text: &'a str) -> Self {
        RunScanner {
            text,
            tokens: Vec::new(),
            position: 0,
            cjk_run: Vec::new(),
            word_start: None,
            word_end: 0,
        }
    }

    fn push(&mut self, text: String, start: usize, end: usize) {
        self.tokens
            .push(Token::with_offsets(text, self.position, start, end));
        self.position += 1;
    }

    fn flush_word(&mut self) {
        if let Some(start) = self.word_start.take() {
            let end = self.word_end;
            self.push(self.text[start..end].to_string(), start, end);
        }
    }

    fn flush_cjk(&mut self) {
        let run = std::mem::take(&mut self.cjk_run);
        match run.len() {
            0 => {}
            1 => {
                let (offset, c) = run[0];
                self.push(c.to_string(), offset, offset + c.len_utf8());
            }
            _ => {
                for pair in run.windows(2) {
                    let (start, a) = pair[0];
                    let (second, b) = pair[1];
                    let mut text = String::with_capacity(a.len_utf8() + b.len_utf8());
                    text.push(a);
                    text.push(b);
                    self.push(text, start, second + b.len_utf8());
                }
            }
        }
    }
}

impl Tokenizer for CjkBigramTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let mut scanner = RunScanner::new(text);

        for (offset, c) in text.char_indices() {
            if Self::is_cjk(c) {
                scanner.flush_word();
                scanner.cjk_run.push((offset, c));
            } else if c.is_alphanumeric() {
                scanner.flush_cjk();
                if scanner.word_start.is_none() {
                    scanner.word_start = Some(offset);
                }
                scanner.word_end = offset + c.len_utf8();
            } else {
                scanner.flush_cjk();
                scanner.flush_word();
            }
        }
        scanner.flush_cjk();
        scanner.flush_word();

        Ok(Box::new(scanner.tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "cjk_bigram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(stream: TokenStream) -> Vec<String> {
        stream.map(|t| t.text).collect()
    }

    #[test]
    fn test_unicode_tokenizer() {
        let tokenizer = UnicodeTokenizer::new();
        let tokens: Vec<Token> = tokenizer.tokenize("Hello, world! 42").unwrap().collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "Hello");
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[2].text, "42");
        assert_eq!(tokens[1].position, 1);
        assert_eq!(tokens[1].start_offset, 7);
        assert_eq!(tokens[1].end_offset, 12);
    }

    #[test]
    fn test_unicode_tokenizer_empty_input() {
        let tokenizer = UnicodeTokenizer::new();
        assert_eq!(tokenizer.tokenize("").unwrap().count(), 0);
        assert_eq!(tokenizer.tokenize("  ...  ").unwrap().count(), 0);
    }

    #[test]
    fn test_cjk_bigrams() {
        let tokenizer = CjkBigramTokenizer::new();
        let tokens = texts(tokenizer.tokenize("数据学习").unwrap());
        assert_eq!(tokens, vec!["数据", "据学", "学习"]);
    }

    #[test]
    fn test_cjk_single_ideograph() {
        let tokenizer = CjkBigramTokenizer::new();
        let tokens = texts(tokenizer.tokenize("丁").unwrap());
        assert_eq!(tokens, vec!["丁"]);
    }

    #[test]
    fn test_cjk_mixed_latin() {
        let tokenizer = CjkBigramTokenizer::new();
        let tokens = texts(tokenizer.tokenize("Lucene 全文检索 library").unwrap());
        assert_eq!(tokens, vec!["Lucene", "全文", "文检", "检索", "library"]);
    }

    #[test]
    fn test_cjk_offsets() {
        let tokenizer = CjkBigramTokenizer::new();
        let tokens: Vec<Token> = tokenizer.tokenize("学习").unwrap().collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].start_offset, 0);
        assert_eq!(tokens[0].end_offset, "学习".len());
    }

    #[test]
    fn test_tokenizer_determinism() {
        let tokenizer = CjkBigramTokenizer::new();
        let a = texts(tokenizer.tokenize("梦幻诛仙 game").unwrap());
        let b = texts(tokenizer.tokenize("梦幻诛仙 game").unwrap());
        assert_eq!(a, b);
    }
}
