//! bg: Continue a job in the background.

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};

use jobsh_types::Placement;

use super::{parse_job_id, require_job, Builtin};
use crate::context::ExecContext;
use crate::error::{ShellError, ShellResult};
use crate::notify::EventBlock;
use crate::shell::Flow;

/// Bg builtin: demote a job and continue it without waiting.
pub struct Bg;

impl Builtin for Bg {
    fn name(&self) -> &str {
        "bg"
    }

    fn usage(&self) -> &str {
        "<jobid>"
    }

    fn execute(&self, args: &[String], ctx: &mut ExecContext) -> ShellResult<Flow> {
        let [handle] = args else {
            return Err(self.usage_error());
        };
        let id = parse_job_id(self, handle)?;

        let _block = EventBlock::new()?;
        require_job(self, ctx, id)?;
        ctx.jobs.set_placement(id, Placement::Background)?;

        if let Some(pgid) = ctx.jobs.job(id)?.pgid() {
            match killpg(pgid, Signal::SIGCONT) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(source) => {
                    return Err(ShellError::Signal {
                        signal: Signal::SIGCONT.as_str(),
                        target: format!("job {}", id),
                        source,
                    })
                }
            }
        }

        tracing::debug!(job = %id, "job continued in background");
        Ok(Flow::Continue)
    }
}
