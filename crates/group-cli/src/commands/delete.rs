//! Delete command implementation

use colored::Colorize;
use group_core::DesiredStateStore;

use crate::context::Context;
use crate::error::{CliError, Result};

/// Mark a desired group for deletion.
pub fn run_delete(ctx: &Context, identity: &str) -> Result<()> {
    let store = ctx.store()?;

    match store.request_deletion(identity) {
        Ok(Some(_)) => println!(
            "{} deletion requested; the directory group is removed on the next reconcile",
            identity.cyan()
        ),
        Ok(None) => println!("{} {}", identity.cyan(), "deleted".green()),
        Err(group_core::Error::NotFound { .. }) => {
            return Err(CliError::user(format!("no desired group named '{}'", identity)));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
