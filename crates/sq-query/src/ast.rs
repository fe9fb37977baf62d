//! Query abstract syntax tree.
//!
//! Represents parsed query expressions before they are handed to a search backend.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::Serialize;

/// Byte offset of a node in the query text.
///
/// Offsets exist for diagnostics only: two positions always compare equal, so
/// trees parsed from differently formatted text are still structurally equal.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(transparent)]
pub struct Pos(pub usize);

impl PartialEq for Pos {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Pos {}

impl Hash for Pos {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QueryExpr {
    /// A single search term.
    Term {
        /// The word.
        text: String,
    },

    /// A quoted phrase.
    Phrase {
        /// Words of the phrase, in order.
        words: Vec<String>,
        /// Disables stemming and synonym expansion downstream.
        exact: bool,
    },

    /// A term matched within an edit distance (`word~N`).
    FuzzyTerm {
        /// The term being matched.
        term: String,
        /// Maximum edit distance; only 1 and 2 pass validation.
        max_edits: u32,
        /// Where the term starts.
        pos: Pos,
    },

    /// A phrase whose words may be up to `distance` words apart (`"a b"~N`).
    ProximityPhrase {
        /// Words of the phrase, in order.
        words: Vec<String>,
        /// Maximum word distance.
        distance: u32,
    },

    /// A term containing `*` or `?`, or using the `!` root expander.
    Wildcard {
        /// The pattern as written, including any `!` prefix.
        pattern: String,
        /// True if the pattern is anchored by a leading `*` or `!`.
        leading: bool,
        /// Where the pattern starts.
        pos: Pos,
    },

    /// An inclusive range (`[low TO high]`).
    Range {
        /// Field the range applies to, taken from the enclosing field qualifier.
        field: Option<String>,
        /// Lower bound.
        low: String,
        /// Upper bound.
        high: String,
        /// Always true; there is no exclusive range syntax.
        inclusive: bool,
        /// Where the opening bracket is.
        pos: Pos,
    },

    /// Field-scoped query: match only within a named field.
    FieldQuery {
        /// Field name.
        name: String,
        /// Expression to match within that field.
        expr: Box<Self>,
        /// Where the field name starts.
        pos: Pos,
    },

    /// Documents similar to the document with the given id (`related:<id>`).
    RelatedQuery {
        /// Identifier of the source document.
        id: u64,
    },

    /// Negation: results must NOT match this expression.
    Not(Box<Self>),

    /// Conjunction of two expressions.
    And(Box<Self>, Box<Self>),

    /// Disjunction of two expressions.
    Or(Box<Self>, Box<Self>),

    /// Explicit parenthesization, kept so queries round-trip.
    Group(Box<Self>),
}

impl QueryExpr {
    /// Creates a term.
    pub fn term(text: impl Into<String>) -> Self {
        Self::Term { text: text.into() }
    }

    /// Creates an exact phrase.
    pub fn phrase<S: Into<String>>(words: impl IntoIterator<Item = S>) -> Self {
        Self::Phrase {
            words: words.into_iter().map(Into::into).collect(),
            exact: true,
        }
    }

    /// Creates a fuzzy term.
    pub fn fuzzy(term: impl Into<String>, max_edits: u32) -> Self {
        Self::FuzzyTerm {
            term: term.into(),
            max_edits,
            pos: Pos::default(),
        }
    }

    /// Creates a proximity phrase.
    pub fn proximity<S: Into<String>>(words: impl IntoIterator<Item = S>, distance: u32) -> Self {
        Self::ProximityPhrase {
            words: words.into_iter().map(Into::into).collect(),
            distance,
        }
    }

    /// Creates a wildcard, deriving `leading` from the pattern.
    pub fn wildcard(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self::Wildcard {
            leading: pattern.starts_with(['*', '!']),
            pattern,
            pos: Pos::default(),
        }
    }

    /// Creates an inclusive range.
    pub fn range(field: Option<&str>, low: impl Into<String>, high: impl Into<String>) -> Self {
        Self::Range {
            field: field.map(String::from),
            low: low.into(),
            high: high.into(),
            inclusive: true,
            pos: Pos::default(),
        }
    }

    /// Creates a field-scoped query.
    pub fn field(name: impl Into<String>, expr: Self) -> Self {
        Self::FieldQuery {
            name: name.into(),
            expr: Box::new(expr),
            pos: Pos::default(),
        }
    }

    /// Creates a negation.
    pub fn not(expr: Self) -> Self {
        Self::Not(Box::new(expr))
    }

    /// Creates a conjunction.
    pub fn and(left: Self, right: Self) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    /// Creates a disjunction.
    pub fn or(left: Self, right: Self) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Creates a group.
    pub fn group(expr: Self) -> Self {
        Self::Group(Box::new(expr))
    }

    /// Returns true if this node is a negation.
    pub fn is_negation(&self) -> bool {
        matches!(self, Self::Not(_))
    }

    /// Returns true if a phrase node appears anywhere in the tree.
    pub fn contains_phrase(&self) -> bool {
        match self {
            Self::Phrase { .. } | Self::ProximityPhrase { .. } => true,
            Self::Term { .. }
            | Self::FuzzyTerm { .. }
            | Self::Wildcard { .. }
            | Self::Range { .. }
            | Self::RelatedQuery { .. } => false,
            Self::FieldQuery { expr, .. } | Self::Not(expr) | Self::Group(expr) => {
                expr.contains_phrase()
            }
            Self::And(left, right) | Self::Or(left, right) => {
                left.contains_phrase() || right.contains_phrase()
            }
        }
    }

    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Term { text } => writeln!(f, "{prefix}Term({text:?})"),
            Self::Phrase { words, exact } => {
                writeln!(f, "{prefix}Phrase({words:?}, exact={exact})")
            }
            Self::FuzzyTerm {
                term, max_edits, ..
            } => writeln!(f, "{prefix}FuzzyTerm({term:?}, max_edits={max_edits})"),
            Self::ProximityPhrase { words, distance } => {
                writeln!(f, "{prefix}ProximityPhrase({words:?}, distance={distance})")
            }
            Self::Wildcard {
                pattern, leading, ..
            } => writeln!(f, "{prefix}Wildcard({pattern:?}, leading={leading})"),
            Self::Range {
                field, low, high, ..
            } => match field {
                Some(name) => writeln!(f, "{prefix}Range({name:?}, {low:?} TO {high:?})"),
                None => writeln!(f, "{prefix}Range({low:?} TO {high:?})"),
            },
            Self::FieldQuery { name, expr, .. } => {
                writeln!(f, "{prefix}FieldQuery({name:?})")?;
                expr.fmt_tree(f, indent + 1)
            }
            Self::RelatedQuery { id } => writeln!(f, "{prefix}RelatedQuery({id})"),
            Self::Not(inner) => {
                writeln!(f, "{prefix}Not")?;
                inner.fmt_tree(f, indent + 1)
            }
            Self::And(left, right) => {
                writeln!(f, "{prefix}And")?;
                left.fmt_tree(f, indent + 1)?;
                right.fmt_tree(f, indent + 1)
            }
            Self::Or(left, right) => {
                writeln!(f, "{prefix}Or")?;
                left.fmt_tree(f, indent + 1)?;
                right.fmt_tree(f, indent + 1)
            }
            Self::Group(inner) => {
                writeln!(f, "{prefix}Group")?;
                inner.fmt_tree(f, indent + 1)
            }
        }
    }

    /// Formats the expression as a query string.
    ///
    /// Connectors are always written out, so the output means the same thing
    /// regardless of the implicit-connector rules, and parsing it again yields an
    /// identical tree.
    pub fn to_query_string(&self) -> String {
        self.fmt_query_string(None)
    }

    /// Internal helper for query string formatting.
    ///
    /// `in_field` is the enclosing field qualifier, so ranges don't repeat it.
    fn fmt_query_string(&self, in_field: Option<&str>) -> String {
        match self {
            Self::Term { text } => text.clone(),
            Self::Phrase { words, .. } => format!("\"{}\"", words.join(" ")),
            Self::FuzzyTerm {
                term, max_edits, ..
            } => format!("{term}~{max_edits}"),
            Self::ProximityPhrase { words, distance } => {
                format!("\"{}\"~{distance}", words.join(" "))
            }
            Self::Wildcard { pattern, .. } => pattern.clone(),
            Self::Range {
                field, low, high, ..
            } => {
                let range = format!("[{low} TO {high}]");
                match field {
                    Some(name) if in_field != Some(name.as_str()) => format!("{name}:{range}"),
                    _ => range,
                }
            }
            Self::FieldQuery { name, expr, .. } => {
                let inner = expr.fmt_query_string(Some(name));
                if expr.is_atom() {
                    format!("{name}:{inner}")
                } else {
                    format!("{name}:({inner})")
                }
            }
            Self::RelatedQuery { id } => format!("related:{id}"),
            Self::Not(inner) => {
                let operand = inner.fmt_query_string(in_field);
                if inner.is_operand() {
                    format!("-{operand}")
                } else {
                    format!("-({operand})")
                }
            }
            Self::And(left, right) => Self::fmt_binary(left, right, "AND", in_field),
            Self::Or(left, right) => Self::fmt_binary(left, right, "OR", in_field),
            Self::Group(inner) => format!("({})", inner.fmt_query_string(in_field)),
        }
    }

    /// Formats a left-associative binary connector.
    ///
    /// The left side may itself be a connector; a connector on the right needs
    /// parentheses to keep its grouping.
    fn fmt_binary(left: &Self, right: &Self, op: &str, in_field: Option<&str>) -> String {
        let lhs = left.fmt_query_string(in_field);
        let rhs = right.fmt_query_string(in_field);
        let lhs = if left.is_operand() || matches!(left, Self::And(..) | Self::Or(..)) {
            lhs
        } else {
            format!("({lhs})")
        };
        let rhs = if right.is_operand() {
            rhs
        } else {
            format!("({rhs})")
        };
        format!("{lhs} {op} {rhs}")
    }

    /// Returns true for nodes written without parentheses after `field:`.
    fn is_atom(&self) -> bool {
        matches!(
            self,
            Self::Term { .. }
                | Self::Phrase { .. }
                | Self::FuzzyTerm { .. }
                | Self::ProximityPhrase { .. }
                | Self::Wildcard { .. }
                | Self::Range { .. }
                | Self::FieldQuery { .. }
        )
    }

    /// Returns true for nodes that can stand as the operand of a connector or `-`.
    fn is_operand(&self) -> bool {
        self.is_atom() || matches!(self, Self::RelatedQuery { .. } | Self::Not(_) | Self::Group(_))
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
