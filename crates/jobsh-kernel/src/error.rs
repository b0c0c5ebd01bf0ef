//! Error types for the job-control core.
//!
//! Every variant is recoverable at the control-loop level: the offending
//! command is abandoned and the loop continues. Exec failures never show up
//! here because they happen in a forked child, which reports and exits on its
//! own (see [`crate::launcher`]).

use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use jobsh_types::JobId;

/// Result type for shell operations.
pub type ShellResult<T> = Result<T, ShellError>;

/// Broad classification of a [`ShellError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed builtin invocation.
    Usage,
    /// Unknown job handle, pid, or process index.
    Lookup,
    /// A file, pipe, fork, signal, or terminal operation failed.
    Resource,
    /// The command line could not be parsed.
    Syntax,
}

/// Shell operation errors.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Usage: {0}")]
    Usage(String),

    #[error("No job with id of {0}.")]
    NoSuchJob(JobId),

    /// `fg`/`bg` name the builtin and handle.
    #[error("{builtin} {job}: No such job.")]
    NoJobToMove { builtin: String, job: JobId },

    #[error("No process with pid {0}.")]
    NoSuchProcess(i32),

    #[error("Job {job} doesn't have a process at index {index}.")]
    NoProcessAtIndex { job: JobId, index: usize },

    #[error("{}: {source}", path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create pipe: {0}")]
    Pipe(#[source] Errno),

    #[error("failed to fork: {0}")]
    Fork(#[source] Errno),

    #[error("Error handing terminal control to process group {pgid}: {source}")]
    Terminal {
        pgid: i32,
        #[source]
        source: Errno,
    },

    #[error("failed to send {signal} to {target}: {source}")]
    Signal {
        signal: &'static str,
        target: String,
        #[source]
        source: Errno,
    },

    #[error("failed to update signal mask: {0}")]
    SignalMask(#[source] Errno),

    #[error("syntax error: {0}")]
    Parse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShellError {
    /// Usage error for a builtin, formatted as `Usage: <name> <synopsis>`.
    pub fn usage(name: &str, synopsis: &str) -> Self {
        ShellError::Usage(format!("{} {}", name, synopsis))
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShellError::Usage(_) => ErrorKind::Usage,
            ShellError::NoSuchJob(_)
            | ShellError::NoJobToMove { .. }
            | ShellError::NoSuchProcess(_)
            | ShellError::NoProcessAtIndex { .. } => ErrorKind::Lookup,
            ShellError::Parse(_) | ShellError::InvalidArgument(_) => ErrorKind::Syntax,
            ShellError::Redirect { .. }
            | ShellError::Pipe(_)
            | ShellError::Fork(_)
            | ShellError::Terminal { .. }
            | ShellError::Signal { .. }
            | ShellError::SignalMask(_)
            | ShellError::Io(_) => ErrorKind::Resource,
        }
    }
}
