//! Execution context shared by the launcher, the arbiter, and builtins.

use crate::config::ShellConfig;
use crate::scheduler::JobRegistry;
use crate::terminal::Terminal;

/// Mutable shell state passed by reference to everything that runs a command.
///
/// There is exactly one registry per shell; builtins and the launcher borrow
/// it from here rather than reaching for global state.
#[derive(Debug)]
pub struct ExecContext {
    /// Live jobs.
    pub jobs: JobRegistry,
    /// Controlling terminal handle.
    pub terminal: Terminal,
    /// Session configuration.
    pub config: ShellConfig,
}

impl ExecContext {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            jobs: JobRegistry::new(),
            terminal: Terminal::new(),
            config,
        }
    }
}
