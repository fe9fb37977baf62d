//! Command implementations and dispatch.

pub mod check;
pub mod config;
pub mod fields;
pub mod init;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub fn run(command: &Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Check(cmd) => check::run(ctx, cmd),
        Commands::Fields => fields::run(ctx),
        Commands::Init(cmd) => init::run(ctx, cmd),
        Commands::Config => config::run(ctx),
    }
}
