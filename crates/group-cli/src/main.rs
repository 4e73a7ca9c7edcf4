//! Group operator CLI
//!
//! Manages desired group documents and reconciles them against an LDAP
//! directory, either one at a time or as a long-running controller.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: failed to initialize logging: {}", "warning".yellow().bold(), e);
    }

    let ctx = Context::load(&cli)?;
    execute_command(&ctx, cli.command)
}

fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Apply { file } => commands::run_apply(ctx, &file),
        Commands::Delete { identity } => commands::run_delete(ctx, &identity),
        Commands::Reconcile { identity, json } => commands::run_reconcile(ctx, &identity, json),
        Commands::Run { once, max_ticks } => commands::run_controller(ctx, once, max_ticks),
        Commands::Check { identity, json } => commands::run_check(ctx, &identity, json),
        Commands::Status { json } => commands::run_status(ctx, json),
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CliError;

    #[test]
    fn test_cli_error_user() {
        let error = CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }

    #[test]
    fn core_errors_display_transparently() {
        let error: CliError = group_core::Error::NotFound {
            identity: "team-x".to_string(),
        }
        .into();
        assert_eq!(error.to_string(), "Desired group not found: team-x");
    }
}
