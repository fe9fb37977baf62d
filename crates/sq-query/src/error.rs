//! Error type for callers that want a `Result` instead of a diagnostic list.

use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// A query that cannot be sent to a search backend.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// At least one fatal diagnostic was reported.
    ///
    /// Displays as the first fatal diagnostic's message, verbatim.
    #[error("{message}")]
    Rejected {
        /// Message of the first fatal diagnostic.
        message: String,
        /// Every diagnostic reported for the query, warnings included.
        diagnostics: Vec<Diagnostic>,
        /// The original query text.
        query: String,
    },
}

impl QueryError {
    /// Returns the user-facing message.
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected { message, .. } => message,
        }
    }

    /// Returns all diagnostics attached to the rejection.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Rejected { diagnostics, .. } => diagnostics,
        }
    }

    /// Renders every fatal diagnostic against the query text.
    pub fn format_with_context(&self) -> String {
        match self {
            Self::Rejected {
                diagnostics, query, ..
            } => diagnostics
                .iter()
                .filter(|d| d.is_fatal())
                .map(|d| d.render(query))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}
