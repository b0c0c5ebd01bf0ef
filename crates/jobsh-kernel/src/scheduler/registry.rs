//! The job registry: the single authoritative table of live jobs.
//!
//! Invariants maintained here:
//! - a job is present iff it has at least one process that is not Terminated
//!   (enforced by [`JobRegistry::synchronize`]; a job under construction may
//!   briefly be empty while the launcher holds the notification block);
//! - at most one job has Foreground placement;
//! - handles are the smallest unused positive integer at allocation time.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use nix::unistd::Pid;

use jobsh_types::{JobId, JobInfo, Placement, ProcessState};

use super::job::Job;
use super::process::Process;
use crate::error::{ShellError, ShellResult};

/// Table of live jobs, keyed by handle, with a reverse pid index.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: BTreeMap<JobId, Job>,
    owners: HashMap<Pid, JobId>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the smallest free handle and store an empty job under it.
    pub fn add_job(&mut self, placement: Placement) -> &mut Job {
        let id = self.next_free_id();
        if placement == Placement::Foreground {
            self.demote_foreground();
        }
        tracing::debug!(job = %id, %placement, "allocated job");
        self.jobs.entry(id).or_insert_with(|| Job::new(id, placement))
    }

    fn next_free_id(&self) -> JobId {
        // BTreeMap keys are sorted, so the first gap is the smallest free handle.
        let mut candidate = JobId::FIRST;
        for id in self.jobs.keys() {
            if *id != candidate {
                break;
            }
            candidate = JobId(candidate.0 + 1);
        }
        candidate
    }

    /// Register a forked stage as the next member of `id`.
    pub fn add_process(&mut self, id: JobId, pid: Pid, command: impl Into<String>) -> ShellResult<()> {
        let job = self.jobs.get_mut(&id).ok_or(ShellError::NoSuchJob(id))?;
        job.add_process(Process::new(pid, command));
        self.owners.insert(pid, id);
        Ok(())
    }

    pub fn contains_job(&self, id: JobId) -> bool {
        self.jobs.contains_key(&id)
    }

    pub fn contains_process(&self, pid: Pid) -> bool {
        self.owners.contains_key(&pid)
    }

    pub fn job(&self, id: JobId) -> ShellResult<&Job> {
        self.jobs.get(&id).ok_or(ShellError::NoSuchJob(id))
    }

    pub fn job_mut(&mut self, id: JobId) -> ShellResult<&mut Job> {
        self.jobs.get_mut(&id).ok_or(ShellError::NoSuchJob(id))
    }

    /// The job owning `pid`.
    pub fn job_with_process(&self, pid: Pid) -> ShellResult<&Job> {
        self.owners
            .get(&pid)
            .and_then(|id| self.jobs.get(id))
            .ok_or(ShellError::NoSuchProcess(pid.as_raw()))
    }

    pub fn has_foreground_job(&self) -> bool {
        self.jobs.values().any(Job::is_foreground)
    }

    pub fn foreground_job(&self) -> Option<&Job> {
        self.jobs.values().find(|job| job.is_foreground())
    }

    /// Whether `id` is live and currently holds Foreground placement.
    pub fn is_foreground(&self, id: JobId) -> bool {
        self.jobs.get(&id).is_some_and(Job::is_foreground)
    }

    /// Change a job's placement. Promoting a job demotes any other
    /// foreground job to the background.
    pub fn set_placement(&mut self, id: JobId, placement: Placement) -> ShellResult<()> {
        if !self.jobs.contains_key(&id) {
            return Err(ShellError::NoSuchJob(id));
        }
        if placement == Placement::Foreground {
            self.demote_foreground();
        }
        self.job_mut(id)?.set_placement(placement);
        Ok(())
    }

    fn demote_foreground(&mut self) {
        for job in self.jobs.values_mut().filter(|job| job.is_foreground()) {
            tracing::debug!(job = %job.id(), "demoting foreground job");
            job.set_placement(Placement::Background);
        }
    }

    /// Re-evaluate a job after one of its processes changed state.
    ///
    /// A job whose processes have all terminated is removed, which frees its
    /// handle and clears its foreground designation. Returns true if the job
    /// was removed.
    pub fn synchronize(&mut self, id: JobId) -> bool {
        let Some(job) = self.jobs.get(&id) else {
            return false;
        };
        if !job.is_terminated() {
            return false;
        }
        if let Some(job) = self.jobs.remove(&id) {
            for process in job.processes() {
                self.owners.remove(&process.pid());
            }
            tracing::debug!(job = %id, "job finished, removed from registry");
        }
        true
    }

    /// Apply a kernel-reported transition to the process `pid` and
    /// synchronize its job. Unknown pids are ignored.
    ///
    /// Returns the owning job's handle if the pid was known.
    pub fn update_process(&mut self, pid: Pid, state: ProcessState) -> Option<JobId> {
        let id = *self.owners.get(&pid)?;
        let job = self.jobs.get_mut(&id)?;
        let process = job.process_mut(pid)?;
        if process.state() == state {
            return Some(id);
        }
        tracing::debug!(job = %id, %pid, from = %process.state(), to = %state, "process transition");
        process.set_state(state);
        self.synchronize(id);
        Some(id)
    }

    /// Live jobs in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Snapshots of all live jobs in handle order.
    pub fn list(&self) -> Vec<JobInfo> {
        self.jobs.values().map(Job::info).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// The `jobs` table: a summary line per job, then one line per process.
impl fmt::Display for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for job in self.jobs.values() {
            writeln!(f, "{} ({})", job, job.placement())?;
            for process in job.processes() {
                writeln!(f, "  {:>7} {:<10} {}", process.pid(), process.state(), process.command())?;
            }
        }
        Ok(())
    }
}
