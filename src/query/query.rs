//! The typed query tree.
//!
//! Queries are an explicit tagged variant rather than trait objects: the
//! whole tree is inspectable, cloneable, and comparable, which the writer
//! relies on for deferred delete-by-query evaluation.

/// Membership requirement of a boolean clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match.
    Must,
    /// The clause must not match.
    MustNot,
    /// The clause may match; with no `Must` clauses present, at least one
    /// `Should` clause has to match.
    Should,
}

/// A search query.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Exact match for keyword and numeric fields; the value is re-analyzed
    /// for analyzed text fields.
    Term {
        /// Field to match in.
        field: String,
        /// Raw value; normalization happens at evaluation time.
        value: String,
    },
    /// Numeric range match. Fails on non-numeric fields.
    Range {
        /// Numeric field to match in.
        field: String,
        /// Lower bound, unbounded when `None`.
        low: Option<i64>,
        /// Upper bound, unbounded when `None`.
        high: Option<i64>,
        /// Whether the lower bound itself matches.
        include_low: bool,
        /// Whether the upper bound itself matches.
        include_high: bool,
    },
    /// Combination of clauses with MUST/MUST_NOT/SHOULD semantics.
    Boolean {
        /// Ordered clause list.
        clauses: Vec<(Query, Occur)>,
    },
    /// Analyzes `text` once and matches it against every listed field,
    /// OR-combining the per-field matches and summing their contributions.
    MultiField {
        /// Fields to search.
        fields: Vec<String>,
        /// Query text.
        text: String,
    },
    /// Ranks `inner`'s matches higher when they also match `boosted`.
    /// `boosted` never restricts the result set.
    Boost {
        /// The query producing the result set.
        inner: Box<Query>,
        /// The secondary query; matching it multiplies the score.
        boosted: Box<Query>,
        /// Score multiplier applied to documents matching `boosted`.
        factor: f32,
    },
    /// Every live document, with a uniform base score.
    MatchAll,
}

impl Query {
    /// Create a term query.
    pub fn term<F, V>(field: F, value: V) -> Self
    where
        F: Into<String>,
        V: Into<String>,
    {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an inclusive/exclusive numeric range query.
    pub fn range<F: Into<String>>(
        field: F,
        low: Option<i64>,
        high: Option<i64>,
        include_low: bool,
        include_high: bool,
    ) -> Self {
        Query::Range {
            field: field.into(),
            low,
            high,
            include_low,
            include_high,
        }
    }

    /// Create a multi-field query.
    pub fn multi_field<I, F, T>(fields: I, text: T) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
        T: Into<String>,
    {
        Query::MultiField {
            fields: fields.into_iter().map(Into::into).collect(),
            text: text.into(),
        }
    }

    /// Create a boost query.
    pub fn boost(inner: Query, boosted: Query, factor: f32) -> Self {
        Query::Boost {
            inner: Box::new(inner),
            boosted: Box::new(boosted),
            factor,
        }
    }

    /// Create a match-all query.
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    /// Start building a boolean query.
    pub fn boolean() -> BooleanQueryBuilder {
        BooleanQueryBuilder::new()
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::Term { field, value } => write!(f, "{field}:{value}"),
            Query::Range {
                field,
                low,
                high,
                include_low,
                include_high,
            } => {
                let open = if *include_low { '[' } else { '{' };
                let close = if *include_high { ']' } else { '}' };
                let low = low.map_or("*".to_string(), |v| v.to_string());
                let high = high.map_or("*".to_string(), |v| v.to_string());
                write!(f, "{field}:{open}{low} TO {high}{close}")
            }
            Query::Boolean { clauses } => {
                write!(f, "(")?;
                for (i, (query, occur)) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match occur {
                        Occur::Must => write!(f, "+{query}")?,
                        Occur::MustNot => write!(f, "-{query}")?,
                        Occur::Should => write!(f, "{query}")?,
                    }
                }
                write!(f, ")")
            }
            Query::MultiField { fields, text } => {
                write!(f, "multi({}):{text}", fields.join(","))
            }
            Query::Boost {
                inner,
                boosted,
                factor,
            } => write!(f, "boost({inner}, {boosted}, {factor})"),
            Query::MatchAll => write!(f, "*:*"),
        }
    }
}

/// Optional fluent sugar over [`Query::Boolean`].
#[derive(Debug, Default)]
pub struct BooleanQueryBuilder {
    clauses: Vec<(Query, Occur)>,
}

impl BooleanQueryBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        BooleanQueryBuilder {
            clauses: Vec::new(),
        }
    }

    /// Add a MUST clause.
    pub fn must(mut self, query: Query) -> Self {
        self.clauses.push((query, Occur::Must));
        self
    }

    /// Add a MUST_NOT clause.
    pub fn must_not(mut self, query: Query) -> Self {
        self.clauses.push((query, Occur::MustNot));
        self
    }

    /// Add a SHOULD clause.
    pub fn should(mut self, query: Query) -> Self {
        self.clauses.push((query, Occur::Should));
        self
    }

    /// Build the boolean query.
    pub fn build(self) -> Query {
        Query::Boolean {
            clauses: self.clauses,
        }
    }
}
