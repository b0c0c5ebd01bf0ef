//! quit, exit: Leave the shell.

use super::Builtin;
use crate::context::ExecContext;
use crate::error::ShellResult;
use crate::shell::Flow;

/// Ends the control loop. Registered under both `quit` and `exit`.
pub struct Quit {
    name: &'static str,
}

impl Quit {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Builtin for Quit {
    fn name(&self) -> &str {
        self.name
    }

    fn usage(&self) -> &str {
        ""
    }

    fn execute(&self, _args: &[String], _ctx: &mut ExecContext) -> ShellResult<Flow> {
        tracing::debug!(builtin = self.name, "leaving control loop");
        Ok(Flow::Exit)
    }
}
