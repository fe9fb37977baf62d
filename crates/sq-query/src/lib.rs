//! Query parsing, AST and validation for sq.
//!
//! This crate turns the boolean search syntax used by legal research engines into a
//! validated tree:
//!
//! - **Terms**: `immigration` - words that must appear
//! - **Phrases**: `"border fence"` - exact sequences
//! - **Connectors**: `wade OR roe`, `a AND b`, `a & b` - evaluated left to right
//! - **Negation**: `-deprecated`, `NOT x`, `%x`
//! - **Grouping**: `(a OR b) c` - precedence control
//! - **Fields**: `caseName:(wade OR roe)` - search specific fields
//! - **Wildcards**: `immigra*`, `gr*mm*r`, `!immigra`
//! - **Fuzzy and proximity**: `immigrant~1`, `"border fence"~50`
//! - **Ranges**: `dateFiled:[2018-10-01 TO 2018-10-31]`
//! - **Similar documents**: `related:2812209`
//!
//! Adjacent clauses are joined with AND, unless a negated clause sits at the same
//! grouping level, in which case they are joined with OR.
//!
//! No stage fails. Problems are reported as [`Diagnostic`]s; fatal ones mean the query
//! must not reach a search backend.
//!
//! # Example
//!
//! ```
//! use sq_query::{QueryOptions, analyze, registry::NoFields};
//!
//! let parsed = analyze("caseName:(wade OR roe) -abortion", &NoFields, &QueryOptions::default());
//! assert!(!parsed.is_rejected());
//!
//! let err = analyze("*ing", &NoFields, &QueryOptions::default())
//!     .into_result()
//!     .unwrap_err();
//! assert_eq!(err.to_string(), "The query contains a disallowed wildcard pattern.");
//! ```

#![warn(missing_docs)]

mod ast;
mod diagnostics;
mod error;
mod lexer;
mod parser;
mod pipeline;
pub mod registry;
mod validate;

pub use ast::{Pos, QueryExpr};
pub use diagnostics::{
    DISALLOWED_WILDCARD_MESSAGE, Diagnostic, DiagnosticKind, Diagnostics, Severity,
};
pub use error::QueryError;
pub use lexer::{Token, TokenKind, quotes_balanced, tokenize};
pub use parser::{DEFAULT_FUZZY_EDITS, parse, parse_tokens, parse_with};
pub use pipeline::{DEFAULT_MAX_DEPTH, ParsedQuery, QueryOptions, analyze};
pub use registry::{FieldRegistry, FieldType, NoFields};
pub use validate::{MIN_WILDCARD_PREFIX, Validator, validate, wildcard_allowed};
