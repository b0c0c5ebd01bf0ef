//! jobsh-kernel: the job-control core of jobsh.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes command lines using logos
//! - **Parser**: Builds a [`Pipeline`] descriptor from tokens
//! - **Scheduler**: Processes, jobs, and the [`JobRegistry`]
//! - **Notify**: Signal handlers, scoped notification blocking, and child reaping
//! - **Launcher**: Forks pipeline stages into one process group
//! - **Foreground**: Waits while a job owns the terminal
//! - **Builtins**: `quit`, `exit`, `fg`, `bg`, `slay`, `halt`, `cont`, `jobs`
//! - **Shell**: The facade a front end drives one line at a time
//!
//! Everything runs on one thread. The signal handlers only set flags; all
//! registry mutation happens on the caller's thread with notifications
//! blocked.

pub mod builtins;
pub mod config;
pub mod context;
pub mod error;
pub mod foreground;
pub mod launcher;
pub mod lexer;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod scheduler;
pub mod shell;
pub mod terminal;

pub use builtins::{Builtin, BuiltinRegistry};
pub use config::ShellConfig;
pub use context::ExecContext;
pub use error::{ErrorKind, ShellError, ShellResult};
pub use pipeline::{Command, Pipeline};
pub use scheduler::{Job, JobRegistry, Process};
pub use shell::{Flow, Shell};
pub use terminal::Terminal;

pub use jobsh_types::{JobId, JobInfo, Placement, ProcessInfo, ProcessState};
