//! Foreground arbitration: block the control loop while a job owns the terminal.
//!
//! The wait is a condition wait on the registry: with notifications blocked,
//! apply whatever has been reported, test the condition, and only then
//! atomically unblock and sleep. A notification that lands between the test
//! and the sleep stays pending and wakes the sleep immediately.

use jobsh_types::{JobId, Placement, ProcessState};

use crate::context::ExecContext;
use crate::error::ShellResult;
use crate::notify::{self, EventBlock};

/// Wait until job `id` no longer holds Foreground placement, then take the
/// terminal back.
///
/// The job leaves the foreground when all of its processes terminate, when
/// another job is promoted, or, only when `stop_releases_foreground` is set,
/// when a stop observed during this wait leaves every process stopped. By
/// default a stopped job keeps the shell waiting. A handle that is not a live
/// foreground job returns immediately.
#[tracing::instrument(level = "debug", skip(ctx))]
pub fn wait_for_foreground(ctx: &mut ExecContext, id: JobId) -> ShellResult<()> {
    if !notify::handlers_installed() {
        notify::install_handlers()?;
    }

    let block = EventBlock::new()?;
    let mut saw_stop = false;

    loop {
        saw_stop |= notify::dispatch(&mut ctx.jobs)
            .iter()
            .any(|t| t.job == Some(id) && t.state == ProcessState::Stopped);

        if !ctx.jobs.is_foreground(id) {
            break;
        }

        if saw_stop && ctx.config.stop_releases_foreground {
            let job = ctx.jobs.job(id)?;
            if job.is_stopped() {
                let command = job.command();
                ctx.jobs.set_placement(id, Placement::Background)?;
                tracing::debug!(job = %id, "foreground job stopped, releasing terminal");
                if ctx.config.announce_stopped {
                    println!("\n[{}]+ Stopped\t{}", id, command);
                }
                break;
            }
        }

        block.suspend()?;
    }

    drop(block);
    ctx.terminal.reclaim()
}
