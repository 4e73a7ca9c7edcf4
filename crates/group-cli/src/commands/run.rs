//! Run command implementation

use tracing::info;

use crate::context::Context;
use crate::error::Result;

/// Poll the store and reconcile every group until stopped.
pub fn run_controller(ctx: &Context, once: bool, max_ticks: Option<u64>) -> Result<()> {
    let mut controller = ctx.controller()?;
    let max_ticks = if once { Some(1) } else { max_ticks };
    let poll_interval = ctx.config.controller.poll_interval();

    info!(
        store = %ctx.config.controller.store_dir.display(),
        directory = %ctx.config.directory.url,
        interval = ?poll_interval,
        "Starting controller"
    );
    controller.run(poll_interval, max_ticks);
    Ok(())
}
