//! Jobs: one pipeline invocation, one process group.

use std::fmt;

use nix::unistd::Pid;

use jobsh_types::{JobId, JobInfo, Placement, ProcessState};

use super::process::Process;

/// A job: ordered processes sharing one process group.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    /// Process group ID; set when the first stage is registered.
    pgid: Option<Pid>,
    placement: Placement,
    /// Stage order. Positional addressing (`slay 1 0`) depends on it.
    processes: Vec<Process>,
}

impl Job {
    pub(crate) fn new(id: JobId, placement: Placement) -> Self {
        Self {
            id,
            pgid: None,
            placement,
            processes: Vec::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Process group of the job; `None` before the first stage is spawned.
    pub fn pgid(&self) -> Option<Pid> {
        self.pgid
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn is_foreground(&self) -> bool {
        self.placement == Placement::Foreground
    }

    pub(crate) fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    /// Register a stage. The first process's pid becomes the group id.
    pub(crate) fn add_process(&mut self, process: Process) {
        if self.pgid.is_none() {
            self.pgid = Some(process.pid());
        }
        self.processes.push(process);
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn contains_process(&self, pid: Pid) -> bool {
        self.processes.iter().any(|p| p.pid() == pid)
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.iter().find(|p| p.pid() == pid)
    }

    pub(crate) fn process_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.iter_mut().find(|p| p.pid() == pid)
    }

    /// Zero-based positional lookup.
    pub fn process_at(&self, index: usize) -> Option<&Process> {
        self.processes.get(index)
    }

    /// True when every process has terminated (vacuously true for an empty job).
    pub fn is_terminated(&self) -> bool {
        self.processes.iter().all(Process::is_terminated)
    }

    /// True when no process is running and at least one is stopped.
    pub fn is_stopped(&self) -> bool {
        !self.processes.is_empty()
            && self.processes.iter().all(|p| p.state() != ProcessState::Running)
            && self.processes.iter().any(|p| p.state() == ProcessState::Stopped)
    }

    /// Command text of the whole pipeline.
    pub fn command(&self) -> String {
        self.processes
            .iter()
            .map(Process::command)
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            id: self.id,
            pgid: self.pgid.map(Pid::as_raw),
            placement: self.placement,
            processes: self.processes.iter().map(Process::info).collect(),
        }
    }
}

/// One-line summary: `[<handle>] <pid> <pid> ...`.
impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.id)?;
        for process in &self.processes {
            write!(f, " {}", process.pid())?;
        }
        Ok(())
    }
}
