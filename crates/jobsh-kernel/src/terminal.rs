//! Controlling-terminal ownership.
//!
//! The terminal's foreground process group decides who receives keyboard
//! signals and may read from the tty. The shell hands it to a foreground job
//! and takes it back when that job stops running in the foreground.
//!
//! When stdin is not a terminal (pipes, scripts, tests) the kernel answers
//! `ENOTTY`; that is treated as "nothing to do", not as an error.

use std::io::IsTerminal;

use nix::errno::Errno;
use nix::unistd::{getpgrp, tcgetpgrp, tcsetpgrp, Pid};

use crate::error::{ShellError, ShellResult};

/// The shell's view of its controlling terminal.
#[derive(Debug, Clone, Copy)]
pub struct Terminal {
    shell_pgid: Pid,
    interactive: bool,
}

impl Terminal {
    /// Capture the shell's process group and whether stdin is a tty.
    pub fn new() -> Self {
        Self {
            shell_pgid: getpgrp(),
            interactive: std::io::stdin().is_terminal(),
        }
    }

    pub fn shell_pgid(&self) -> Pid {
        self.shell_pgid
    }

    /// Whether stdin is attached to a terminal.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Make `pgid` the terminal's foreground process group.
    pub fn give_to(&self, pgid: Pid) -> ShellResult<()> {
        tracing::debug!(%pgid, "handing terminal to process group");
        set_foreground_group(pgid)
    }

    /// Make the shell's own process group the foreground group again.
    pub fn reclaim(&self) -> ShellResult<()> {
        tracing::debug!(pgid = %self.shell_pgid, "reclaiming terminal");
        set_foreground_group(self.shell_pgid)
    }

    /// Current foreground process group, or `None` without a terminal.
    pub fn owner(&self) -> Option<Pid> {
        tcgetpgrp(std::io::stdin()).ok()
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

fn set_foreground_group(pgid: Pid) -> ShellResult<()> {
    // SIGTTOU is ignored by the shell, so a background caller is not stopped.
    match tcsetpgrp(std::io::stdin(), pgid) {
        Ok(()) | Err(Errno::ENOTTY) => Ok(()),
        Err(source) => Err(ShellError::Terminal {
            pgid: pgid.as_raw(),
            source,
        }),
    }
}
