//! Implementation of `sq config`.

use std::process::ExitCode;

use crate::cli::{
    context::CommandContext,
    output::{dim, warning},
};

/// Shows effective configuration settings, the files they came from, and any warnings.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config = &ctx.config;
    let toml = match config.settings_to_toml() {
        Ok(toml) => toml,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    print!("{toml}");

    println!();
    if config.sources.is_empty() {
        println!("{}", dim("# no configuration files found; using defaults"));
    } else {
        for path in &config.sources {
            println!("{}", dim(&format!("# from {}", path.display())));
        }
    }

    for w in config.validate() {
        eprintln!("{} {w}", warning("warning:"));
    }

    ExitCode::SUCCESS
}
