//! A single process participating in a pipeline.

use nix::unistd::Pid;

use jobsh_types::{ProcessInfo, ProcessState};

/// One forked pipeline stage.
///
/// The state is only changed in response to kernel-reported transitions
/// (see [`crate::notify`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pid: Pid,
    command: String,
    state: ProcessState,
}

impl Process {
    /// A freshly forked process, assumed running.
    pub fn new(pid: Pid, command: impl Into<String>) -> Self {
        Self {
            pid,
            command: command.into(),
            state: ProcessState::Running,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Command text of the stage this process runs.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ProcessState::Terminated
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid.as_raw(),
            command: self.command.clone(),
            state: self.state,
        }
    }
}
