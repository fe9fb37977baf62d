//! Implementation of `sq check`.

use std::process::ExitCode;

use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use sq_query::{Diagnostic, ParsedQuery, QueryOptions, Severity, analyze, tokenize};
use tracing::info;

use crate::cli::{
    args::CheckCommand,
    context::CommandContext,
    output::{
        JsonCheckOutput, JsonQueryReport, dim, error, header, indent, print_json, subheader,
        success, warning,
    },
};

/// Parses and validates each query, reporting trees and diagnostics.
///
/// Exits with failure if any query is rejected.
pub fn run(ctx: &CommandContext, cmd: &CheckCommand) -> ExitCode {
    let options = query_options(ctx, cmd);
    let reports: Vec<ParsedQuery> = cmd
        .queries
        .iter()
        .map(|query| analyze(query, ctx.config.fields(), &options))
        .collect();

    let rejected = reports.iter().filter(|r| r.is_rejected()).count();
    info!(queries = reports.len(), rejected, "check finished");

    if cmd.json {
        let output = JsonCheckOutput {
            queries: reports
                .iter()
                .map(|parsed| JsonQueryReport {
                    parsed,
                    canonical: parsed.query.as_ref().map(|q| q.to_query_string()),
                    rejected: parsed.is_rejected(),
                    tokens: cmd.tokens.then(|| tokenize(&parsed.input)),
                })
                .collect(),
        };
        if let Err(e) = print_json(&output) {
            eprintln!("error: failed to serialize JSON: {e}");
            return ExitCode::FAILURE;
        }
    } else {
        for (i, parsed) in reports.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_report(parsed, cmd.tokens);
        }
    }

    if rejected > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Applies command-line overrides on top of the configured options.
fn query_options(ctx: &CommandContext, cmd: &CheckCommand) -> QueryOptions {
    let mut options = ctx.config.query_options();
    if cmd.strict {
        options.strict_fields = true;
    }
    if let Some(max_depth) = cmd.max_depth {
        options.max_depth = max_depth;
    }
    options
}

/// Prints the human-readable report for one query.
fn print_report(parsed: &ParsedQuery, show_tokens: bool) {
    println!("{}", header(&format!("Query: {}", parsed.input)));

    if show_tokens {
        println!("{}", subheader("Tokens:"));
        let tokens = tokenize(&parsed.input);
        if tokens.is_empty() {
            println!("  {}", dim("(none)"));
        } else {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL_CONDENSED);
            table.set_header(vec!["Offset", "Kind", "Text"]);
            for token in &tokens {
                table.add_row(vec![
                    Cell::new(token.offset),
                    Cell::new(format!("{:?}", token.kind)),
                    Cell::new(&token.text),
                ]);
            }
            println!("{table}");
        }
    }

    println!("{}", subheader("Canonical:"));
    match &parsed.query {
        Some(query) => {
            println!("  {}", query.to_query_string());
            println!("{}", subheader("Tree:"));
            println!("{}", indent(&query.to_string(), "  "));
        }
        None => println!("  {}", dim("(empty)")),
    }

    if !parsed.diagnostics.is_empty() {
        println!("{}", subheader("Diagnostics:"));
        for diagnostic in parsed.diagnostics.iter() {
            println!("{}", indent(&styled_render(diagnostic, &parsed.input), "  "));
        }
    }

    let warnings = parsed.diagnostics.warnings().count();
    let status = if parsed.is_rejected() {
        error("rejected")
    } else if warnings > 0 {
        warning(&format!("ok ({warnings} warning{})", plural(warnings)))
    } else {
        success("ok")
    };
    println!("{} {status}", subheader("Status:"));
}

/// Renders a diagnostic with its first line colored by severity.
fn styled_render(diagnostic: &Diagnostic, query: &str) -> String {
    let rendered = diagnostic.render(query);
    let (first, rest) = rendered.split_once('\n').unwrap_or((rendered.as_str(), ""));
    let first = match diagnostic.severity {
        Severity::Fatal => error(first),
        Severity::Warning => warning(first),
    };
    if rest.is_empty() {
        first
    } else {
        format!("{first}\n{rest}")
    }
}

/// Returns "s" unless `n` is one.
fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
