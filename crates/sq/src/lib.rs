//! sq: search query checker
//!
//! Parses and validates boolean full-text search queries written in CourtListener-style
//! syntax before they reach a search backend. Queries are reported back as a canonical
//! string, a tree, and a list of diagnostics; a query with any fatal diagnostic is rejected.
//!
//! The parsing and validation pipeline lives in `sq-query`; `.sq.toml` discovery and the
//! field registry live in `sq-config`. This crate holds the command-line front end.

#![warn(missing_docs)]

pub mod cli;
