//! Check command implementation

use colored::Colorize;
use group_core::DesiredStateStore;
use group_directory::DriftStatus;

use crate::context::Context;
use crate::error::{CliError, Result};

/// Compare a stored group with its directory entry without writing.
pub fn run_check(ctx: &Context, identity: &str, json: bool) -> Result<()> {
    let group = ctx
        .store()?
        .get(identity)?
        .ok_or_else(|| CliError::user(format!("no desired group named '{}'", identity)))?;

    let drift = ctx
        .directory()?
        .diff_group(identity, &group.spec.comment, &group.spec.members)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&drift)?);
        return Ok(());
    }

    let status = match drift.status {
        DriftStatus::InSync => "in sync".green(),
        DriftStatus::Missing => "missing".red(),
        DriftStatus::Drifted => "drifted".yellow(),
    };
    println!("{} {}", identity.cyan(), status);
    if let Some(dn) = &drift.distinguished_name {
        println!("  {}: {}", "DN".dimmed(), dn);
    }
    for line in drift.describe() {
        println!("  {} {}", "-".yellow(), line);
    }
    Ok(())
}
