//! Clap argument definitions for the `sq` CLI.

use clap::{ArgAction, Args, Parser, Subcommand};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "sq")]
#[command(about = "Search query checker - parse and validate boolean search queries")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments for `sq check`.
#[derive(Args, Debug, Clone)]
pub struct CheckCommand {
    /// Queries to check
    #[arg(required = true)]
    pub queries: Vec<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show the token stream for each query
    #[arg(long)]
    pub tokens: bool,

    /// Warn about fields not declared in configuration
    #[arg(long)]
    pub strict: bool,

    /// Maximum nesting depth [default: 128]
    #[arg(long)]
    pub max_depth: Option<usize>,
}

/// Arguments for `sq init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Create global ~/.sq.toml instead
    #[arg(long)]
    pub global: bool,

    /// Overwrite existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Supported `sq` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Parse and validate queries
    #[command(after_help = "\
QUERY SYNTAX:
  term                 Term must appear
  term1 term2          Both terms (implicit AND)
  term1 OR term2       Either term
  NOT term, -term      Exclude a term
  \"phrase\"             Exact phrase
  \"phrase\"~5           Phrase with proximity
  term~2               Fuzzy term
  appl*, !appl         Wildcard and root expander
  field:value          Field query
  field:[a TO b]       Range query
  related:123          Related documents
  (expr)               Grouping

EXAMPLES:
  sq check 'caseName:\"Roe v. Wade\"'
  sq check 'dateFiled:[2018-10-01 TO 2018-10-31] court_id:ca1'
  sq check --json 'contract -(breach OR fraud)'")]
    Check(CheckCommand),

    /// Show declared fields and their types
    Fields,

    /// Initialize sq configuration in current directory
    Init(InitCommand),

    /// Show effective configuration settings
    Config,
}

/// Parses CLI arguments, exiting with usage on error.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
