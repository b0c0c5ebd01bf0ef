//! The shell facade: one command line in, one control-flow decision out.

use crate::builtins::BuiltinRegistry;
use crate::config::ShellConfig;
use crate::context::ExecContext;
use crate::error::ShellResult;
use crate::foreground::wait_for_foreground;
use crate::launcher::launch;
use crate::notify::{self, EventBlock};
use crate::parser::parse;
use crate::scheduler::JobRegistry;

/// What the control loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Leave the loop; the process exits with status 0.
    Exit,
}

/// A job-control shell session.
#[derive(Debug)]
pub struct Shell {
    ctx: ExecContext,
    builtins: BuiltinRegistry,
}

impl Shell {
    /// Create a session and install the shell's signal dispositions.
    pub fn new(config: ShellConfig) -> ShellResult<Self> {
        notify::install_handlers()?;
        Ok(Self {
            ctx: ExecContext::new(config),
            builtins: BuiltinRegistry::with_defaults(),
        })
    }

    /// Run one command line.
    ///
    /// Blank lines do nothing. A line led by a builtin runs in-process;
    /// anything else is launched as a job and, unless it ends in `&`, waited
    /// for in the foreground.
    pub fn execute(&mut self, line: &str) -> ShellResult<Flow> {
        self.poll();
        if line.trim().is_empty() {
            return Ok(Flow::Continue);
        }

        let pipeline = parse(line)?;
        tracing::debug!(%pipeline, "parsed command line");

        if let Some(builtin) = pipeline.leader().and_then(|name| self.builtins.get(name)) {
            let args = &pipeline.commands[0].args;
            return builtin.execute(args, &mut self.ctx);
        }

        let id = launch(&mut self.ctx, &pipeline)?;
        if !pipeline.background {
            wait_for_foreground(&mut self.ctx, id)?;
        }
        Ok(Flow::Continue)
    }

    /// Apply notifications that arrived since the last command.
    pub fn poll(&mut self) {
        match EventBlock::new() {
            Ok(_block) => {
                notify::dispatch(&mut self.ctx.jobs);
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    /// Live jobs.
    pub fn jobs(&self) -> &JobRegistry {
        &self.ctx.jobs
    }

    pub fn config(&self) -> &ShellConfig {
        &self.ctx.config
    }

    pub fn is_interactive(&self) -> bool {
        self.ctx.terminal.is_interactive()
    }
}
