//! jobs: List live jobs.

use super::Builtin;
use crate::context::ExecContext;
use crate::error::ShellResult;
use crate::notify::{self, EventBlock};
use crate::shell::Flow;

/// Jobs builtin: print each job's summary line and its processes.
pub struct Jobs;

impl Builtin for Jobs {
    fn name(&self) -> &str {
        "jobs"
    }

    fn usage(&self) -> &str {
        ""
    }

    fn execute(&self, _args: &[String], ctx: &mut ExecContext) -> ShellResult<Flow> {
        let _block = EventBlock::new()?;
        notify::dispatch(&mut ctx.jobs);
        print!("{}", ctx.jobs);
        Ok(Flow::Continue)
    }
}
