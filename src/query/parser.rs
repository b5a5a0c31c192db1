//! A small query-string parser.
//!
//! Grammar, loosely Lucene-flavored:
//!
//! ```text
//! query   := clause (("AND" | "OR")? clause)*
//! clause  := ('+' | '-')? atom
//! atom    := '(' query ')'
//!          | field ':' (range | phrase | word)
//!          | phrase
//!          | word
//! range   := ('[' | '{') bound "TO" bound (']' | '}')
//! bound   := integer | '*'
//! phrase  := '"' ... '"'
//! ```
//!
//! `*:*` matches all documents. A bare word searches the parser's default
//! fields. Clauses without a prefix are SHOULD, `+` is MUST, `-` is
//! MUST_NOT; `AND` upgrades both adjacent clauses to MUST, `OR` leaves them
//! SHOULD. Quoted phrases expand to a conjunction of their words (positions
//! are not checked). Parse failures report the byte offset of the offending
//! input.

use crate::error::{Result, TamarixError};
use crate::query::query::{Occur, Query};

/// Parses query strings into [`Query`] trees.
#[derive(Debug, Clone)]
pub struct QueryParser {
    default_fields: Vec<String>,
}

impl QueryParser {
    /// Create a parser searching `default_fields` for bare terms.
    pub fn new<I, S>(default_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryParser {
            default_fields: default_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The fields bare terms search.
    pub fn default_fields(&self) -> &[String] {
        &self.default_fields
    }

    /// Parse a query string.
    pub fn parse(&self, input: &str) -> Result<Query> {
        let mut cursor = Cursor::new(input);
        let query = self.parse_query(&mut cursor)?;
        cursor.skip_whitespace();
        if !cursor.is_at_end() {
            return Err(cursor.error("unexpected trailing input"));
        }
        Ok(query)
    }

    fn parse_query(&self, cursor: &mut Cursor<'_>) -> Result<Query> {
        let mut clauses: Vec<(Query, Occur)> = Vec::new();
        let mut pending_and = false;

        loop {
            cursor.skip_whitespace();
            if cursor.is_at_end() || cursor.peek() == Some(')') {
                break;
            }

            if let Some(connector) = cursor.take_connector() {
                if clauses.is_empty() {
                    return Err(cursor.error("connector needs a left operand"));
                }
                if connector == Connector::And {
                    if let Some(last) = clauses.last_mut() {
                        if last.1 == Occur::Should {
                            last.1 = Occur::Must;
                        }
                    }
                    pending_and = true;
                }
                continue;
            }

            let mut occur = match cursor.peek() {
                Some('+') => {
                    cursor.bump();
                    Occur::Must
                }
                Some('-') => {
                    cursor.bump();
                    Occur::MustNot
                }
                _ => Occur::Should,
            };
            let atom = self.parse_atom(cursor)?;
            // An explicit +/- prefix wins over the connector.
            if pending_and && occur == Occur::Should {
                occur = Occur::Must;
            }
            pending_and = false;
            clauses.push((atom, occur));
        }

        if pending_and {
            return Err(cursor.error("expected a clause after 'AND'"));
        }
        match clauses.len() {
            0 => Err(cursor.error("empty query")),
            1 if clauses[0].1 == Occur::Should => Ok(clauses.into_iter().next().unwrap().0),
            _ => Ok(Query::Boolean { clauses }),
        }
    }

    fn parse_atom(&self, cursor: &mut Cursor<'_>) -> Result<Query> {
        match cursor.peek() {
            Some('(') => {
                cursor.bump();
                let inner = self.parse_query(cursor)?;
                cursor.skip_whitespace();
                if cursor.peek() != Some(')') {
                    return Err(cursor.error("expected ')'"));
                }
                cursor.bump();
                return Ok(inner);
            }
            Some('"') => {
                let words = cursor.take_phrase()?;
                return self.default_phrase_query(cursor, &words);
            }
            _ => {}
        }

        let word = cursor.take_word()?;
        if cursor.peek() != Some(':') {
            return self.default_field_query(cursor, word);
        }
        cursor.bump();

        match cursor.peek() {
            Some('[') | Some('{') => self.parse_range(cursor, word),
            Some('"') => {
                let words = cursor.take_phrase()?;
                Ok(phrase_query(
                    words.iter().map(|w| Query::term(word.clone(), w.clone())),
                ))
            }
            Some('*') => {
                cursor.bump();
                if word == "*" {
                    Ok(Query::match_all())
                } else {
                    Err(cursor.error("'*' is only valid as '*:*' or a range bound"))
                }
            }
            _ => {
                let value = cursor.take_word()?;
                Ok(Query::term(word, value))
            }
        }
    }

    fn parse_range(&self, cursor: &mut Cursor<'_>, field: String) -> Result<Query> {
        let include_low = cursor.bump() == Some('[');
        cursor.skip_whitespace();
        let low = self.parse_bound(cursor)?;
        cursor.skip_whitespace();
        let keyword = cursor.take_word()?;
        if keyword != "TO" {
            return Err(cursor.error("expected 'TO' between range bounds"));
        }
        cursor.skip_whitespace();
        let high = self.parse_bound(cursor)?;
        cursor.skip_whitespace();
        let include_high = match cursor.bump() {
            Some(']') => true,
            Some('}') => false,
            _ => return Err(cursor.error("expected ']' or '}' to close range")),
        };
        Ok(Query::range(field, low, high, include_low, include_high))
    }

    fn parse_bound(&self, cursor: &mut Cursor<'_>) -> Result<Option<i64>> {
        if cursor.peek() == Some('*') {
            cursor.bump();
            return Ok(None);
        }
        let position = cursor.position;
        let word = cursor.take_word()?;
        word.parse::<i64>()
            .map(Some)
            .map_err(|_| cursor.error_at(position, "range bound must be an integer or '*'"))
    }

    fn default_field_query(&self, cursor: &Cursor<'_>, word: String) -> Result<Query> {
        match self.default_fields.len() {
            0 => Err(cursor.error("bare term with no default fields configured")),
            1 => Ok(Query::term(self.default_fields[0].clone(), word)),
            _ => Ok(Query::multi_field(self.default_fields.clone(), word)),
        }
    }

    fn default_phrase_query(&self, cursor: &Cursor<'_>, words: &[String]) -> Result<Query> {
        if self.default_fields.is_empty() {
            return Err(cursor.error("quoted phrase with no default fields configured"));
        }
        Ok(phrase_query(words.iter().map(|w| {
            if self.default_fields.len() == 1 {
                Query::term(self.default_fields[0].clone(), w.clone())
            } else {
                Query::multi_field(self.default_fields.clone(), w.clone())
            }
        })))
    }
}

/// Combine a phrase's word queries into a MUST conjunction; a single word
/// stays a plain query.
fn phrase_query<I: Iterator<Item = Query>>(words: I) -> Query {
    let mut queries: Vec<Query> = words.collect();
    if queries.len() == 1 {
        queries.pop().unwrap()
    } else {
        Query::Boolean {
            clauses: queries.into_iter().map(|q| (q, Occur::Must)).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Connector {
    And,
    Or,
}

/// Byte-position cursor over the input.
#[derive(Debug)]
struct Cursor<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Cursor { input, position: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    fn word_end(&self) -> usize {
        let rest = &self.input[self.position..];
        let offset = rest
            .char_indices()
            .find(|(_, c)| {
                c.is_whitespace() || matches!(c, ':' | '(' | ')' | '[' | ']' | '{' | '}' | '"')
            })
            .map_or(rest.len(), |(i, _)| i);
        self.position + offset
    }

    /// Consume `AND` or `OR` if the next word is one.
    fn take_connector(&mut self) -> Option<Connector> {
        let end = self.word_end();
        match &self.input[self.position..end] {
            "AND" => {
                self.position = end;
                Some(Connector::And)
            }
            "OR" => {
                self.position = end;
                Some(Connector::Or)
            }
            _ => None,
        }
    }

    /// Take a run of word characters (everything except whitespace, quotes,
    /// and the parser's structural characters).
    fn take_word(&mut self) -> Result<String> {
        let end = self.word_end();
        if end == self.position {
            return Err(self.error("expected a term"));
        }
        let word = self.input[self.position..end].to_string();
        self.position = end;
        Ok(word)
    }

    /// Take a quoted phrase, returning its whitespace-separated words.
    fn take_phrase(&mut self) -> Result<Vec<String>> {
        let open = self.position;
        self.bump(); // opening quote
        let start = self.position;
        while let Some(c) = self.peek() {
            if c == '"' {
                let words: Vec<String> = self.input[start..self.position]
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                self.bump();
                if words.is_empty() {
                    return Err(self.error_at(open, "empty phrase"));
                }
                return Ok(words);
            }
            self.bump();
        }
        Err(self.error_at(open, "unterminated phrase"))
    }

    fn error(&self, message: &str) -> TamarixError {
        self.error_at(self.position, message)
    }

    fn error_at(&self, position: usize, message: &str) -> TamarixError {
        TamarixError::query_parse(self.input, position, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::new(["title"])
    }

    #[test]
    fn test_bare_term_uses_default_field() {
        assert_eq!(parser().parse("study").unwrap(), Query::term("title", "study"));
    }

    #[test]
    fn test_bare_term_with_multiple_defaults() {
        let parser = QueryParser::new(["title", "body"]);
        assert_eq!(
            parser.parse("study").unwrap(),
            Query::multi_field(["title", "body"], "study")
        );
    }

    #[test]
    fn test_fielded_term() {
        assert_eq!(
            parser().parse("author:Fly").unwrap(),
            Query::term("author", "Fly")
        );
    }

    #[test]
    fn test_boolean_prefixes() {
        let query = parser().parse("+study -author:WD data").unwrap();
        assert_eq!(
            query,
            Query::Boolean {
                clauses: vec![
                    (Query::term("title", "study"), Occur::Must),
                    (Query::term("author", "WD"), Occur::MustNot),
                    (Query::term("title", "data"), Occur::Should),
                ]
            }
        );
    }

    #[test]
    fn test_or_connector_keeps_should() {
        let query = parser().parse("title:学好 OR title:学习").unwrap();
        assert_eq!(
            query,
            Query::Boolean {
                clauses: vec![
                    (Query::term("title", "学好"), Occur::Should),
                    (Query::term("title", "学习"), Occur::Should),
                ]
            }
        );
    }

    #[test]
    fn test_and_connector_upgrades_to_must() {
        let query = parser().parse("study AND data").unwrap();
        assert_eq!(
            query,
            Query::Boolean {
                clauses: vec![
                    (Query::term("title", "study"), Occur::Must),
                    (Query::term("title", "data"), Occur::Must),
                ]
            }
        );
    }

    #[test]
    fn test_quoted_phrase_becomes_conjunction() {
        let query = parser().parse("\"data study\"").unwrap();
        assert_eq!(
            query,
            Query::Boolean {
                clauses: vec![
                    (Query::term("title", "data"), Occur::Must),
                    (Query::term("title", "study"), Occur::Must),
                ]
            }
        );
        assert_eq!(
            parser().parse("author:\"Fly\"").unwrap(),
            Query::term("author", "Fly")
        );
    }

    #[test]
    fn test_range_forms() {
        assert_eq!(
            parser().parse("id:[105 TO 108]").unwrap(),
            Query::range("id", Some(105), Some(108), true, true)
        );
        assert_eq!(
            parser().parse("id:{105 TO 108}").unwrap(),
            Query::range("id", Some(105), Some(108), false, false)
        );
        assert_eq!(
            parser().parse("id:[* TO 100]").unwrap(),
            Query::range("id", None, Some(100), true, true)
        );
    }

    #[test]
    fn test_match_all() {
        assert_eq!(parser().parse("*:*").unwrap(), Query::match_all());
    }

    #[test]
    fn test_grouping() {
        let query = parser().parse("+(study data) -cooking").unwrap();
        match query {
            Query::Boolean { clauses } => {
                assert_eq!(clauses.len(), 2);
                assert!(matches!(clauses[0], (Query::Boolean { .. }, Occur::Must)));
                assert_eq!(clauses[1], (Query::term("title", "cooking"), Occur::MustNot));
            }
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn test_errors_carry_position() {
        let err = parser().parse("id:[abc TO 5]").unwrap_err();
        match err {
            TamarixError::QueryParse { position, .. } => assert_eq!(position, 4),
            other => panic!("expected QueryParse, got {other:?}"),
        }

        assert!(parser().parse("").is_err());
        assert!(parser().parse("(study").is_err());
        assert!(parser().parse("id:[1 TO 2").is_err());
        assert!(parser().parse("\"open phrase").is_err());
        assert!(parser().parse("AND study").is_err());
        assert!(parser().parse("study AND").is_err());
    }
}
