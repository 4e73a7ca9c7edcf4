//! Status command implementation

use colored::Colorize;
use group_core::{ConditionStatus, DesiredGroup, DesiredStateStore, LifecyclePhase};
use serde::Serialize;

use crate::context::Context;
use crate::error::Result;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupSummary<'a> {
    identity: &'a str,
    phase: LifecyclePhase,
    deletion_requested: bool,
    distinguished_name: Option<&'a str>,
    conditions: &'a group_core::Conditions,
}

impl<'a> From<&'a DesiredGroup> for GroupSummary<'a> {
    fn from(group: &'a DesiredGroup) -> Self {
        Self {
            identity: group.identity(),
            phase: group.phase(),
            deletion_requested: group.deletion_requested(),
            distinguished_name: group.status.distinguished_name.as_deref(),
            conditions: &group.status.conditions,
        }
    }
}

/// List every stored group.
pub fn run_status(ctx: &Context, json: bool) -> Result<()> {
    let store = ctx.store()?;
    let mut groups = Vec::new();
    for identity in store.list()? {
        if let Some(group) = store.get(&identity)? {
            groups.push(group);
        }
    }

    if json {
        let summaries: Vec<GroupSummary<'_>> = groups.iter().map(GroupSummary::from).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("{}", "Desired Groups".bold());
    println!("{}:  {}", "Store".dimmed(), store.root().display());
    println!();

    if groups.is_empty() {
        println!("  {} (use {} to add)", "None".dimmed(), "groupctl apply".cyan());
        return Ok(());
    }

    for group in &groups {
        println!("  {} {}", group.identity().cyan(), group.phase());
        if let Some(dn) = &group.status.distinguished_name {
            println!("    {}: {}", "DN".dimmed(), dn);
        }
        for condition in group.status.conditions.iter() {
            let status = match condition.status {
                ConditionStatus::True => "True".green(),
                ConditionStatus::False => "False".yellow(),
                ConditionStatus::Unknown => "Unknown".dimmed(),
            };
            let reason = condition.reason.as_deref().unwrap_or("");
            println!(
                "    {}={} {} {}",
                condition.condition_type,
                status,
                reason.dimmed(),
                condition.last_transition_time.to_rfc3339().dimmed()
            );
        }
    }
    Ok(())
}
