//! Semantic checks on a parsed query.
//!
//! The parser accepts anything it can build a tree from. The validator then rejects
//! the patterns a search backend cannot run cheaply or correctly: unbounded wildcard
//! prefixes, out-of-range fuzzy distances, and range endpoints that don't fit their
//! field's type.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::{
    ast::{Pos, QueryExpr},
    diagnostics::{DISALLOWED_WILDCARD_MESSAGE, DiagnosticKind, Diagnostics},
    registry::{FieldRegistry, FieldType},
};

/// Shortest literal prefix allowed before a trailing `*` or after `!`.
pub const MIN_WILDCARD_PREFIX: usize = 3;

/// Accepted fuzzy edit distances.
const FUZZY_EDITS: [u32; 2] = [1, 2];

/// Calendar dates in range endpoints.
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern is a valid regex")
});

/// Returns true if `value` is written as `YYYY-MM-DD`.
fn is_date(value: &str) -> bool {
    DATE_PATTERN.is_match(value)
}

/// Returns true if `value` is a finite number.
fn is_number(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Returns true if a wildcard pattern is allowed.
///
/// A leading `*` is never allowed. A pattern that ends in `*`, or uses the `!`
/// root form, needs at least [`MIN_WILDCARD_PREFIX`] characters before its first
/// `*`. A `?` fills exactly one character, so it counts toward the prefix.
pub fn wildcard_allowed(pattern: &str) -> bool {
    if pattern.starts_with('*') {
        return false;
    }

    let (body, rooted) = match pattern.strip_prefix('!') {
        Some(body) => (body, true),
        None => (pattern, false),
    };

    if !rooted && !body.ends_with('*') {
        return true;
    }

    let prefix = body.split('*').next().unwrap_or_default();
    prefix.chars().count() >= MIN_WILDCARD_PREFIX
}

/// Walks a query tree and reports what a search backend would reject.
///
/// The registry is only read, so a validator can be shared across threads.
pub struct Validator<'r, R: ?Sized> {
    /// Field types used to check ranges.
    registry: &'r R,
    /// Report fields the registry doesn't know.
    strict_fields: bool,
}

impl<'r, R: FieldRegistry + ?Sized> Validator<'r, R> {
    /// Creates a validator backed by `registry`.
    pub fn new(registry: &'r R) -> Self {
        Self {
            registry,
            strict_fields: false,
        }
    }

    /// Warns about fields the registry reports as unknown.
    pub fn strict_fields(mut self, strict: bool) -> Self {
        self.strict_fields = strict;
        self
    }

    /// Validates a tree and returns the findings.
    pub fn validate(&self, expr: &QueryExpr) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        // Connector chains are as deep as the query is long, so walk with a stack.
        let mut stack = vec![expr];
        while let Some(node) = stack.pop() {
            match node {
                QueryExpr::Wildcard {
                    pattern,
                    pos: Pos(offset),
                    ..
                } => {
                    if !wildcard_allowed(pattern) {
                        trace!(pattern, "rejected wildcard");
                        diagnostics.push(
                            DiagnosticKind::DisallowedWildcard,
                            *offset,
                            DISALLOWED_WILDCARD_MESSAGE,
                        );
                    }
                }
                QueryExpr::FuzzyTerm {
                    term,
                    max_edits,
                    pos: Pos(offset),
                } => {
                    if !FUZZY_EDITS.contains(max_edits) {
                        diagnostics.push(
                            DiagnosticKind::InvalidFuzzyValue,
                            *offset,
                            format!(
                                "fuzzy edit distance for '{term}' must be 1 or 2, got {max_edits}"
                            ),
                        );
                    }
                }
                QueryExpr::Range {
                    field: Some(field),
                    low,
                    high,
                    pos: Pos(offset),
                    ..
                } => self.check_range(field, [low, high], *offset, &mut diagnostics),
                QueryExpr::FieldQuery {
                    name,
                    expr,
                    pos: Pos(offset),
                } => {
                    if self.strict_fields && self.registry.lookup(name) == FieldType::Unknown {
                        diagnostics.push(
                            DiagnosticKind::UnknownField,
                            *offset,
                            format!("unknown field '{name}'"),
                        );
                    }
                    stack.push(expr);
                }
                QueryExpr::Not(inner) | QueryExpr::Group(inner) => stack.push(inner),
                QueryExpr::And(left, right) | QueryExpr::Or(left, right) => {
                    // Right first so the left side is reported first.
                    stack.push(right);
                    stack.push(left);
                }
                QueryExpr::Term { .. }
                | QueryExpr::Phrase { .. }
                | QueryExpr::ProximityPhrase { .. }
                | QueryExpr::Range { field: None, .. }
                | QueryExpr::RelatedQuery { .. } => {}
            }
        }

        diagnostics
    }

    /// Checks range endpoints against the field's declared type.
    fn check_range(
        &self,
        field: &str,
        endpoints: [&String; 2],
        offset: usize,
        diagnostics: &mut Diagnostics,
    ) {
        match self.registry.lookup(field) {
            FieldType::Date => {
                for value in endpoints.into_iter().filter(|v| !is_date(v)) {
                    diagnostics.push(
                        DiagnosticKind::InvalidDateFormat,
                        offset,
                        format!("'{value}' is not a date; {field} expects YYYY-MM-DD"),
                    );
                }
            }
            FieldType::Number => {
                for value in endpoints.into_iter().filter(|v| !is_number(v)) {
                    diagnostics.push(
                        DiagnosticKind::InvalidNumberFormat,
                        offset,
                        format!("'{value}' is not a number; {field} expects numeric bounds"),
                    );
                }
            }
            FieldType::Text | FieldType::Unknown => {}
        }
    }
}

/// Validates a tree against a field registry with default settings.
pub fn validate<R: FieldRegistry + ?Sized>(expr: &QueryExpr, registry: &R) -> Diagnostics {
    Validator::new(registry).validate(expr)
}
