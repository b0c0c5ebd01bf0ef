//! fg: Continue a job in the foreground.

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};

use jobsh_types::Placement;

use super::{parse_job_id, require_job, Builtin};
use crate::context::ExecContext;
use crate::error::{ShellError, ShellResult};
use crate::foreground::wait_for_foreground;
use crate::notify::EventBlock;
use crate::shell::Flow;

/// Fg builtin: promote a job, continue it, and wait for it.
pub struct Fg;

impl Builtin for Fg {
    fn name(&self) -> &str {
        "fg"
    }

    fn usage(&self) -> &str {
        "<jobid>"
    }

    fn execute(&self, args: &[String], ctx: &mut ExecContext) -> ShellResult<Flow> {
        let [handle] = args else {
            return Err(self.usage_error());
        };
        let id = parse_job_id(self, handle)?;

        {
            let _block = EventBlock::new()?;
            require_job(self, ctx, id)?;
            let job = ctx.jobs.job(id)?;
            let pgid = job.pgid();
            println!("{}", job.command());

            ctx.jobs.set_placement(id, Placement::Foreground)?;
            if let Some(pgid) = pgid {
                ctx.terminal.give_to(pgid)?;
                match killpg(pgid, Signal::SIGCONT) {
                    Ok(()) | Err(Errno::ESRCH) => {}
                    Err(source) => {
                        ctx.jobs.set_placement(id, Placement::Background)?;
                        ctx.terminal.reclaim()?;
                        return Err(ShellError::Signal {
                            signal: Signal::SIGCONT.as_str(),
                            target: format!("job {}", id),
                            source,
                        });
                    }
                }
            }
            tracing::debug!(job = %id, "job moved to foreground");
        }

        wait_for_foreground(ctx, id)?;
        Ok(Flow::Continue)
    }
}
