//! Structured diagnostics produced while lexing, parsing and validating a query.
//!
//! Every stage reports its findings into a [`Diagnostics`] sink instead of returning
//! errors. Severity is a property of the [`DiagnosticKind`], so the classification
//! lives in exactly one place.

use std::{fmt, slice};

use serde::Serialize;

/// User-facing message for a rejected wildcard pattern.
///
/// Callers surface this string verbatim, so it must not change.
pub const DISALLOWED_WILDCARD_MESSAGE: &str = "The query contains a disallowed wildcard pattern.";

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The query proceeds with degraded or approximate semantics.
    Warning,
    /// The query must be rejected before it reaches a search backend.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Fatal => write!(f, "error"),
        }
    }
}

/// The category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// Odd number of `"` characters; quoting was disabled for the whole query.
    UnbalancedQuotes,
    /// A leading `*`, or a trailing wildcard on a prefix shorter than three characters.
    DisallowedWildcard,
    /// A fuzzy edit distance outside `{1, 2}`.
    InvalidFuzzyValue,
    /// A proximity distance that is not an unsigned integer.
    InvalidProximityValue,
    /// A bracketed range that cannot be parsed.
    InvalidRangeSyntax,
    /// A bracketed range using a lowercase `to`.
    MalformedRange,
    /// A date field range endpoint that is not `YYYY-MM-DD`.
    InvalidDateFormat,
    /// A number field range endpoint that is not numeric.
    InvalidNumberFormat,
    /// A `related:` value that is not a non-negative integer.
    InvalidRelatedId,
    /// Nesting deeper than the configured limit.
    MaxDepthExceeded,
    /// An unclosed `(` or a stray `)`.
    UnbalancedParentheses,
    /// An operator with nothing to operate on.
    DanglingOperator,
    /// A field qualifier with no value after the colon.
    EmptyFieldValue,
    /// A postfix modifier applied to something that cannot take it.
    UnsupportedModifier,
    /// A field the registry does not know about (strict mode only).
    UnknownField,
    /// An empty phrase or group that was left out of the query.
    EmptyClause,
}

impl DiagnosticKind {
    /// Returns the severity every diagnostic of this kind carries.
    pub fn severity(self) -> Severity {
        match self {
            Self::DisallowedWildcard
            | Self::InvalidFuzzyValue
            | Self::InvalidProximityValue
            | Self::InvalidRangeSyntax
            | Self::InvalidDateFormat
            | Self::InvalidNumberFormat
            | Self::MaxDepthExceeded
            | Self::UnsupportedModifier => Severity::Fatal,
            Self::UnbalancedQuotes
            | Self::MalformedRange
            | Self::InvalidRelatedId
            | Self::UnbalancedParentheses
            | Self::DanglingOperator
            | Self::EmptyFieldValue
            | Self::UnknownField
            | Self::EmptyClause => Severity::Warning,
        }
    }

    /// Returns a hint for fixing the problem, if there is a useful one.
    pub fn suggestion(self) -> Option<&'static str> {
        match self {
            Self::UnbalancedQuotes => {
                Some("Add a closing quote (\") so phrases are recognized again")
            }
            Self::DisallowedWildcard => Some(
                "Wildcards cannot start a word, and a trailing * or ! needs at least 3 letters before it",
            ),
            Self::InvalidFuzzyValue => Some("Fuzzy edit distance must be 1 or 2, e.g. 'immigrant~1'"),
            Self::InvalidProximityValue => {
                Some("Proximity needs a whole number of words, e.g. '\"border fence\"~50'")
            }
            Self::InvalidRangeSyntax | Self::MalformedRange => {
                Some("Ranges look like [low TO high], with TO in uppercase")
            }
            Self::InvalidDateFormat => Some("Dates in ranges must be written as YYYY-MM-DD"),
            Self::InvalidRelatedId => Some("related: takes a numeric document id, e.g. related:2812209"),
            Self::UnbalancedParentheses => {
                Some("Add a matching parenthesis to balance the grouping")
            }
            Self::DanglingOperator => {
                Some("AND, OR and NOT need expressions on both sides, e.g. 'wade OR roe'")
            }
            Self::InvalidNumberFormat
            | Self::MaxDepthExceeded
            | Self::EmptyFieldValue
            | Self::UnsupportedModifier
            | Self::UnknownField
            | Self::EmptyClause => None,
        }
    }
}

/// A single finding from one of the pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// Whether the query must be rejected.
    pub severity: Severity,
    /// Byte offset into the query text.
    pub offset: usize,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic, deriving severity from the kind.
    pub fn new(kind: DiagnosticKind, offset: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            offset,
            message: message.into(),
        }
    }

    /// Returns true if this diagnostic rejects the query.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }

    /// Formats the diagnostic against the query text, pointing a caret at the offset.
    pub fn render(&self, query: &str) -> String {
        let mut result = format!("{}: {}\n", self.severity, self.message);
        let clamped = self.offset.min(query.len());
        // Caret column counts characters, not bytes.
        let column = query
            .get(..clamped)
            .map_or(clamped, |prefix| prefix.chars().count());
        result.push_str(&format!("  {query}\n"));
        result.push_str(&format!("  {}^", " ".repeat(column)));
        if let Some(hint) = self.kind.suggestion() {
            result.push_str(&format!("\nhint: {hint}"));
        }
        result
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}: {}", self.severity, self.offset, self.message)
    }
}

/// Passive sink that accumulates diagnostics from every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    /// Collected diagnostics, in the order they were reported.
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn push(&mut self, kind: DiagnosticKind, offset: usize, message: impl Into<String>) {
        self.items.push(Diagnostic::new(kind, offset, message));
    }

    /// Appends every diagnostic from another collector.
    pub fn extend(&mut self, other: Self) {
        self.items.extend(other.items);
    }

    /// Orders diagnostics by offset, keeping report order for equal offsets.
    pub fn sort_by_offset(&mut self) {
        self.items.sort_by_key(|d| d.offset);
    }

    /// Returns true if any diagnostic is fatal.
    pub fn has_fatal(&self) -> bool {
        self.items.iter().any(Diagnostic::is_fatal)
    }

    /// Returns the fatal diagnostics.
    pub fn fatal(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_fatal())
    }

    /// Returns the warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| !d.is_fatal())
    }

    /// Returns true if a diagnostic of the given kind was recorded.
    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }

    /// Iterates over all diagnostics.
    pub fn iter(&self) -> slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Number of diagnostics collected.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the collector, returning the diagnostics.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
