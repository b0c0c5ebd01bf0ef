//! Scheduler module for jobsh: jobs, processes, and the registry that owns them.
//!
//! This module provides:
//! - **Processes**: one forked pipeline stage with its last observed state.
//! - **Jobs**: one pipeline invocation; its processes share a process group.
//! - **Registry**: the table of live jobs, handle allocation, and the
//!   single-foreground rule.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      JobRegistry                            │
//! │  jobs:   BTreeMap<JobId, Job>     (smallest free handle)    │
//! │  owners: HashMap<Pid, JobId>      (reverse lookup)          │
//! │  - add_job(placement) → &mut Job                            │
//! │  - add_process(id, pid, command)                            │
//! │  - update_process(pid, state) → synchronize(id)             │
//! │  - set_placement(id, placement)                             │
//! └─────────────────────────────────────────────────────────────┘
//!          ▲                                   ▲
//!          │ fork/setpgid                      │ waitpid transitions
//! ┌────────┴────────┐                 ┌────────┴────────┐
//! │    launcher     │                 │     notify      │
//! └─────────────────┘                 └─────────────────┘
//! ```
//!
//! Nothing here touches the kernel. Mutations arrive from the launcher
//! (new processes) and from [`crate::notify`] (state transitions), both on the
//! main control path with notifications blocked.

mod job;
mod process;
mod registry;

pub use job::Job;
pub use process::Process;
pub use registry::JobRegistry;
