//! Reconcile command implementation

use colored::Colorize;
use group_core::{LifecyclePhase, ReconcileOutcome};

use crate::context::Context;
use crate::error::Result;

/// Run one reconciliation for `identity` and print the outcome.
pub fn run_reconcile(ctx: &Context, identity: &str, json: bool) -> Result<()> {
    let outcome = ctx.reconciler()?.reconcile(identity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &ReconcileOutcome) {
    let phase = match outcome.phase {
        LifecyclePhase::Converged => outcome.phase.to_string().green(),
        LifecyclePhase::Released => outcome.phase.to_string().dimmed(),
        _ => outcome.phase.to_string().yellow(),
    };
    let change = if outcome.mutation_occurred {
        "directory updated".yellow()
    } else {
        "no directory changes".dimmed()
    };

    println!("{} {} ({})", outcome.identity.cyan(), phase, change);
    if let Some(dn) = &outcome.distinguished_name {
        println!("  {}: {}", "DN".dimmed(), dn);
    }
}
