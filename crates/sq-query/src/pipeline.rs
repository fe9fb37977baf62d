//! The full text-to-validated-query pipeline.

use serde::Serialize;
use tracing::debug;

use crate::{
    ast::QueryExpr,
    diagnostics::Diagnostics,
    error::QueryError,
    parser::parse_with,
    registry::FieldRegistry,
    validate::Validator,
};

/// Default nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Knobs for parsing and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Deepest nesting of groups, negations and field qualifiers.
    pub max_depth: usize,
    /// Warn about fields the registry doesn't know.
    pub strict_fields: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_fields: false,
        }
    }
}

/// A query tree together with everything reported about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    /// The query text.
    pub input: String,
    /// The tree; None when nothing searchable remained.
    pub query: Option<QueryExpr>,
    /// Findings from every stage, ordered by offset.
    pub diagnostics: Diagnostics,
}

impl ParsedQuery {
    /// Returns true if any diagnostic rejects the query.
    pub fn is_rejected(&self) -> bool {
        self.diagnostics.has_fatal()
    }

    /// Converts into a `Result`, failing when any diagnostic is fatal.
    ///
    /// Warnings are dropped on success.
    pub fn into_result(self) -> Result<Option<QueryExpr>, QueryError> {
        let first = self.diagnostics.fatal().next().map(|d| d.message.clone());
        let Some(message) = first else {
            return Ok(self.query);
        };
        Err(QueryError::Rejected {
            message,
            diagnostics: self.diagnostics.into_vec(),
            query: self.input,
        })
    }
}

/// Lexes, parses and validates a query.
///
/// Never fails; check [`ParsedQuery::is_rejected`] or call
/// [`ParsedQuery::into_result`].
pub fn analyze<R: FieldRegistry + ?Sized>(
    input: &str,
    registry: &R,
    options: &QueryOptions,
) -> ParsedQuery {
    let mut parsed = parse_with(input, options);

    if let Some(query) = &parsed.query {
        let found = Validator::new(registry)
            .strict_fields(options.strict_fields)
            .validate(query);
        parsed.diagnostics.extend(found);
        parsed.diagnostics.sort_by_offset();
    }

    debug!(
        fatal = parsed.diagnostics.fatal().count(),
        warnings = parsed.diagnostics.warnings().count(),
        "analyzed query"
    );
    parsed
}
