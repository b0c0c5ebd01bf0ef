//! Job identification and status types.

use std::fmt;
use std::str::FromStr;

/// Handle for a job: a small positive integer, unique among live jobs.
///
/// Handles are reused once a job leaves the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub usize);

impl JobId {
    /// The smallest handle ever assigned.
    pub const FIRST: JobId = JobId(1);

    /// Parse a user-supplied handle. Zero and non-numeric input are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.parse::<usize>() {
            Ok(0) | Err(_) => None,
            Ok(n) => Some(JobId(n)),
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobId::parse(s).ok_or(())
    }
}

/// Run state of a single process, as last reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// Process is running (or runnable).
    Running,
    /// Process was stopped by a signal (e.g., Ctrl-Z / SIGTSTP).
    Stopped,
    /// Process exited or was killed by a signal.
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Running => "Running",
            ProcessState::Stopped => "Stopped",
            ProcessState::Terminated => "Terminated",
        };
        f.pad(name)
    }
}

/// Whether a job owns the terminal and blocks the shell's loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Foreground,
    Background,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Foreground => write!(f, "foreground"),
            Placement::Background => write!(f, "background"),
        }
    }
}

/// Snapshot of one process for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// OS process ID.
    pub pid: i32,
    /// Command text of the pipeline stage.
    pub command: String,
    /// Current state.
    pub state: ProcessState,
}

/// Snapshot of one job for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    /// Job handle.
    pub id: JobId,
    /// Process group ID (None until the first stage is spawned).
    pub pgid: Option<i32>,
    /// Foreground or background.
    pub placement: Placement,
    /// Member processes in stage order.
    pub processes: Vec<ProcessInfo>,
}

impl JobInfo {
    /// The pipeline's command text, stages joined with ` | `.
    pub fn command(&self) -> String {
        self.processes
            .iter()
            .map(|p| p.command.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
