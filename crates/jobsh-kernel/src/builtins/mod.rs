//! Builtin commands for jobsh.
//!
//! Builtins run inside the shell process and operate on the job registry.
//! A command line whose first word names a builtin is never forked; any
//! pipes, redirections, or `&` on such a line are ignored.
//!
//! # Architecture
//!
//! ```text
//! BuiltinRegistry
//! ├── quit, exit        leave the control loop
//! ├── fg, bg            move a job between placements
//! ├── slay, halt, cont  signal one process
//! └── jobs              print the job table
//! ```

mod bg;
mod fg;
mod jobs;
mod quit;
mod signal;

use std::collections::BTreeMap;

use nix::unistd::Pid;

use jobsh_types::JobId;

use crate::context::ExecContext;
use crate::error::{ShellError, ShellResult};
use crate::shell::Flow;

/// A command implemented by the shell itself.
pub trait Builtin {
    /// The name the command is invoked by.
    fn name(&self) -> &str;

    /// Argument synopsis shown after `Usage: <name>`.
    fn usage(&self) -> &str;

    /// Run with `args` (not including the command name).
    fn execute(&self, args: &[String], ctx: &mut ExecContext) -> ShellResult<Flow>;

    /// Usage error for this builtin.
    fn usage_error(&self) -> ShellError {
        ShellError::usage(self.name(), self.usage())
    }
}

/// Name → builtin lookup table.
#[derive(Default)]
pub struct BuiltinRegistry {
    builtins: BTreeMap<String, Box<dyn Builtin>>,
}

impl BuiltinRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every standard builtin.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Register a builtin, replacing any previous one with the same name.
    pub fn register(&mut self, builtin: impl Builtin + 'static) {
        self.builtins.insert(builtin.name().to_string(), Box::new(builtin));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Builtin> {
        self.builtins.get(name).map(Box::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builtins.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Register all builtins with the registry.
pub fn register_builtins(registry: &mut BuiltinRegistry) {
    registry.register(quit::Quit::new("quit"));
    registry.register(quit::Quit::new("exit"));
    registry.register(fg::Fg);
    registry.register(bg::Bg);
    registry.register(signal::SignalBuiltin::slay());
    registry.register(signal::SignalBuiltin::halt());
    registry.register(signal::SignalBuiltin::cont());
    registry.register(jobs::Jobs);
}

/// Parse a job handle argument.
fn parse_job_id(builtin: &dyn Builtin, arg: &str) -> ShellResult<JobId> {
    JobId::parse(arg).ok_or_else(|| builtin.usage_error())
}

/// Fail with `<name> N: No such job.` unless `id` is live.
fn require_job(builtin: &dyn Builtin, ctx: &ExecContext, id: JobId) -> ShellResult<()> {
    if ctx.jobs.contains_job(id) {
        Ok(())
    } else {
        Err(ShellError::NoJobToMove { builtin: builtin.name().to_string(), job: id })
    }
}

/// Parse a pid argument. Only positive pids name a single process.
fn parse_pid(builtin: &dyn Builtin, arg: &str) -> ShellResult<Pid> {
    match arg.parse::<i32>() {
        Ok(n) if n > 0 => Ok(Pid::from_raw(n)),
        _ => Err(builtin.usage_error()),
    }
}
