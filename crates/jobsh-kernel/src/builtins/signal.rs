//! slay, halt, cont: Signal a single process of a job.
//!
//! A target is either a pid, or a job handle plus a zero-based position in
//! the job's pipeline:
//!
//! ```text
//! slay 4242      # pid 4242
//! halt 2 1       # second process of job 2
//! ```

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use jobsh_types::ProcessState;

use super::{parse_job_id, parse_pid, Builtin};
use crate::context::ExecContext;
use crate::error::{ShellError, ShellResult};
use crate::notify::EventBlock;
use crate::scheduler::JobRegistry;
use crate::shell::Flow;

/// A builtin that sends one fixed signal to one process.
pub struct SignalBuiltin {
    name: &'static str,
    signal: Signal,
    /// State in which the signal would change nothing; the process is left alone.
    skip_when: Option<ProcessState>,
}

impl SignalBuiltin {
    /// `slay`: terminate with SIGKILL.
    pub fn slay() -> Self {
        Self { name: "slay", signal: Signal::SIGKILL, skip_when: None }
    }

    /// `halt`: stop with SIGTSTP.
    pub fn halt() -> Self {
        Self { name: "halt", signal: Signal::SIGTSTP, skip_when: Some(ProcessState::Stopped) }
    }

    /// `cont`: continue with SIGCONT.
    pub fn cont() -> Self {
        Self { name: "cont", signal: Signal::SIGCONT, skip_when: Some(ProcessState::Running) }
    }

    /// Find the target process. A stage that already terminated is gone even
    /// though its job lives on; its pid may belong to someone else by now.
    fn resolve(&self, args: &[String], jobs: &JobRegistry) -> ShellResult<(Pid, ProcessState)> {
        let (pid, state) = match args {
            [pid] => {
                let pid = parse_pid(self, pid)?;
                let process = jobs
                    .job_with_process(pid)?
                    .process(pid)
                    .ok_or(ShellError::NoSuchProcess(pid.as_raw()))?;
                (pid, process.state())
            }
            [handle, index] => {
                let id = parse_job_id(self, handle)?;
                let index: usize = index.parse().map_err(|_| self.usage_error())?;
                let process = jobs
                    .job(id)?
                    .process_at(index)
                    .ok_or(ShellError::NoProcessAtIndex { job: id, index })?;
                (process.pid(), process.state())
            }
            _ => return Err(self.usage_error()),
        };

        if state == ProcessState::Terminated {
            return Err(ShellError::NoSuchProcess(pid.as_raw()));
        }
        Ok((pid, state))
    }
}

impl Builtin for SignalBuiltin {
    fn name(&self) -> &str {
        self.name
    }

    fn usage(&self) -> &str {
        "<jobid> <index> | <pid>"
    }

    fn execute(&self, args: &[String], ctx: &mut ExecContext) -> ShellResult<Flow> {
        let _block = EventBlock::new()?;
        let (pid, state) = self.resolve(args, &ctx.jobs)?;

        if self.skip_when == Some(state) {
            tracing::debug!(builtin = self.name, %pid, %state, "nothing to do");
            return Ok(Flow::Continue);
        }

        tracing::debug!(builtin = self.name, %pid, signal = self.signal.as_str(), "signalling process");
        match kill(pid, self.signal) {
            // Already gone; the pending child notification will record it.
            Ok(()) | Err(Errno::ESRCH) => Ok(Flow::Continue),
            Err(source) => Err(ShellError::Signal {
                signal: self.signal.as_str(),
                target: format!("pid {}", pid),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn registry_with(pids: &[i32]) -> JobRegistry {
        let mut jobs = JobRegistry::new();
        let id = jobs.add_job(jobsh_types::Placement::Background).id();
        for &p in pids {
            jobs.add_process(id, Pid::from_raw(p), "sleep 5").unwrap();
        }
        jobs
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_by_pid_and_position() {
        let jobs = registry_with(&[100, 101]);
        let slay = SignalBuiltin::slay();
        assert_eq!(
            slay.resolve(&args(&["101"]), &jobs).unwrap(),
            (Pid::from_raw(101), ProcessState::Running)
        );
        assert_eq!(
            slay.resolve(&args(&["1", "0"]), &jobs).unwrap(),
            (Pid::from_raw(100), ProcessState::Running)
        );
    }

    #[rstest]
    #[case(&["1", "2"], "Job 1 doesn't have a process at index 2.")]
    #[case(&["1", "5"], "Job 1 doesn't have a process at index 5.")]
    #[case(&["2", "0"], "No job with id of 2.")]
    #[case(&["102"], "No process with pid 102.")]
    fn unresolvable_targets(#[case] argv: &[&str], #[case] message: &str) {
        let jobs = registry_with(&[100, 101]);
        let err = SignalBuiltin::slay().resolve(&args(argv), &jobs).unwrap_err();
        assert_eq!(err.to_string(), message);
    }

    #[rstest]
    #[case(&["101"])]
    #[case(&["1", "1"])]
    fn terminated_stage_is_not_a_target(#[case] argv: &[&str]) {
        let mut jobs = registry_with(&[100, 101]);
        jobs.update_process(Pid::from_raw(101), ProcessState::Terminated);
        assert!(jobs.contains_job(jobsh_types::JobId(1)));

        for builtin in [SignalBuiltin::slay(), SignalBuiltin::halt(), SignalBuiltin::cont()] {
            let err = builtin.resolve(&args(argv), &jobs).unwrap_err();
            assert_eq!(err.to_string(), "No process with pid 101.");
        }
        // The live stage is still reachable.
        assert!(SignalBuiltin::slay().resolve(&args(&["1", "0"]), &jobs).is_ok());
    }

    #[test]
    fn halt_and_cont_skip_states() {
        assert_eq!(SignalBuiltin::halt().skip_when, Some(ProcessState::Stopped));
        assert_eq!(SignalBuiltin::cont().skip_when, Some(ProcessState::Running));
        assert_eq!(SignalBuiltin::slay().skip_when, None);
        assert_eq!(SignalBuiltin::halt().signal, Signal::SIGTSTP);
    }

    #[test]
    fn cont_on_running_sends_nothing() {
        // pid 100 is not our child, so it must be left untouched.
        let mut ctx = ExecContext::new(crate::config::ShellConfig::default());
        ctx.jobs = registry_with(&[100]);
        let flow = SignalBuiltin::cont().execute(&args(&["1", "0"]), &mut ctx).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(ctx.jobs.job(jobsh_types::JobId(1)).unwrap().processes()[0].state(), ProcessState::Running);
    }
}
