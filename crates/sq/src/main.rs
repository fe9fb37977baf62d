//! Command-line interface for the `sq` query checker.

use std::{io, process::ExitCode};

use sq::cli::{
    CommandContext,
    args::{Commands, parse_cli},
    commands,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = parse_cli();
    init_tracing(cli.verbose);

    // `init` must work even when an existing config is broken.
    let ctx = if matches!(cli.command, Commands::Init(_)) {
        CommandContext::load_cwd_only()
    } else {
        CommandContext::load()
    };

    match ctx {
        Ok(ctx) => commands::run(&cli.command, &ctx),
        Err(code) => code,
    }
}

/// Installs a stderr log subscriber. `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
