//! Asynchronous notifications: child status changes and keyboard signals.
//!
//! The handlers installed here only record that a signal arrived. Everything
//! else (reaping, registry updates, forwarding to the foreground job) runs on
//! the main control path through [`dispatch`], which callers invoke while
//! holding an [`EventBlock`] so the registry is never observed mid-update.
//!
//! ```text
//!   kernel ──SIGCHLD──▶ on_child      ──▶ CHILD_PENDING
//!   tty    ──SIGINT───▶ on_interrupt  ──▶ INTERRUPT_PENDING
//!   tty    ──SIGTSTP──▶ on_suspend    ──▶ SUSPEND_PENDING
//!                                              │
//!   main path: EventBlock ─▶ dispatch() ◀──────┘
//!                              ├─ reap_children()  (waitpid drain)
//!                              └─ forward_to_foreground()
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{
    killpg, pthread_sigmask, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use jobsh_types::{JobId, ProcessState};

use crate::error::{ShellError, ShellResult};
use crate::scheduler::JobRegistry;

static CHILD_PENDING: AtomicBool = AtomicBool::new(false);
static INTERRUPT_PENDING: AtomicBool = AtomicBool::new(false);
static SUSPEND_PENDING: AtomicBool = AtomicBool::new(false);
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Signals that carry notifications and are blocked by [`EventBlock`].
const EVENT_SIGNALS: [Signal; 3] = [Signal::SIGCHLD, Signal::SIGINT, Signal::SIGTSTP];

/// Every signal whose disposition the shell changes; children get the defaults back.
const HANDLED_SIGNALS: [Signal; 6] = [
    Signal::SIGCHLD,
    Signal::SIGINT,
    Signal::SIGTSTP,
    Signal::SIGQUIT,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

extern "C" fn on_child(_: libc::c_int) {
    CHILD_PENDING.store(true, Ordering::SeqCst);
}

extern "C" fn on_interrupt(_: libc::c_int) {
    INTERRUPT_PENDING.store(true, Ordering::SeqCst);
}

extern "C" fn on_suspend(_: libc::c_int) {
    SUSPEND_PENDING.store(true, Ordering::SeqCst);
}

extern "C" fn on_quit(_: libc::c_int) {
    // SAFETY: _exit is async-signal-safe.
    unsafe { libc::_exit(0) }
}

fn event_set() -> SigSet {
    let mut set = SigSet::empty();
    for signal in EVENT_SIGNALS {
        set.add(signal);
    }
    set
}

/// Install the shell's signal dispositions.
///
/// Must run before the first job is launched. Installing twice is harmless.
pub fn install_handlers() -> ShellResult<()> {
    let flags = SaFlags::SA_RESTART;
    let table: [(Signal, SigHandler); 6] = [
        (Signal::SIGCHLD, SigHandler::Handler(on_child)),
        (Signal::SIGINT, SigHandler::Handler(on_interrupt)),
        (Signal::SIGTSTP, SigHandler::Handler(on_suspend)),
        (Signal::SIGQUIT, SigHandler::Handler(on_quit)),
        (Signal::SIGTTIN, SigHandler::SigIgn),
        (Signal::SIGTTOU, SigHandler::SigIgn),
    ];

    for (signal, handler) in table {
        let action = SigAction::new(handler, flags, SigSet::empty());
        // SAFETY: the handlers only store to atomics or call _exit, both async-signal-safe.
        unsafe { sigaction(signal, &action) }.map_err(|source| ShellError::Signal {
            signal: signal.as_str(),
            target: "the shell".into(),
            source,
        })?;
    }

    INSTALLED.store(true, Ordering::SeqCst);
    tracing::debug!("signal handlers installed");
    Ok(())
}

/// Whether [`install_handlers`] has run in this process.
pub fn handlers_installed() -> bool {
    INSTALLED.load(Ordering::SeqCst)
}

/// Restore default dispositions and an empty mask. Called in a forked child
/// before exec; failures are ignored since the child has nowhere to report them.
pub fn reset_for_child() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in HANDLED_SIGNALS {
        // SAFETY: restoring SIG_DFL installs no Rust code as a handler.
        let _ = unsafe { sigaction(signal, &default) };
    }
    let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None);
}

/// Scoped suppression of notification delivery.
///
/// While a guard is alive, SIGCHLD, SIGINT and SIGTSTP stay pending instead
/// of running their handlers. Dropping the guard restores the mask that was
/// in effect when it was created, so guards nest.
#[derive(Debug)]
pub struct EventBlock {
    saved: SigSet,
}

impl EventBlock {
    pub fn new() -> ShellResult<Self> {
        let mut saved = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&event_set()), Some(&mut saved))
            .map_err(ShellError::SignalMask)?;
        Ok(Self { saved })
    }

    /// Atomically unblock notifications and sleep until one is delivered.
    ///
    /// The mask is blocked again when this returns, so the caller can re-check
    /// its wake condition without racing a new notification.
    pub fn suspend(&self) -> ShellResult<()> {
        let mut mask = self.saved;
        for signal in EVENT_SIGNALS {
            mask.remove(signal);
        }
        // EINTR after a handler runs is the normal wake-up; nix maps it to Ok.
        mask.suspend().map_err(ShellError::SignalMask)
    }
}

impl Drop for EventBlock {
    fn drop(&mut self) {
        if let Err(e) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.saved), None) {
            tracing::warn!("failed to restore signal mask: {}", e);
        }
    }
}

/// One kernel-reported status change, as applied to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub pid: Pid,
    /// Owning job, or `None` for a pid the registry doesn't know.
    pub job: Option<JobId>,
    pub state: ProcessState,
}

fn state_of(status: WaitStatus) -> Option<(Pid, ProcessState)> {
    match status {
        WaitStatus::Exited(pid, _) | WaitStatus::Signaled(pid, _, _) => {
            Some((pid, ProcessState::Terminated))
        }
        WaitStatus::Stopped(pid, _) => Some((pid, ProcessState::Stopped)),
        WaitStatus::Continued(pid) => Some((pid, ProcessState::Running)),
        _ => None,
    }
}

/// Collect every pending child status change and apply it to the registry.
///
/// Loops until the kernel reports nothing further, so several children that
/// changed state under a single coalesced SIGCHLD are all observed.
pub fn reap_children(jobs: &mut JobRegistry) -> Vec<Transition> {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    let mut transitions = Vec::new();

    loop {
        match waitpid(Pid::from_raw(-1), Some(flags)) {
            Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
            Ok(status) => {
                let Some((pid, state)) = state_of(status) else {
                    continue;
                };
                let job = jobs.update_process(pid, state);
                tracing::debug!(%pid, %state, ?job, "reaped child status");
                transitions.push(Transition { pid, job, state });
            }
            Err(Errno::EINTR) => continue,
            Err(e) => {
                tracing::warn!("waitpid failed: {}", e);
                break;
            }
        }
    }

    transitions
}

/// Deliver `signal` to the foreground job's process group, if there is one.
pub fn forward_to_foreground(jobs: &JobRegistry, signal: Signal) -> ShellResult<()> {
    let Some(job) = jobs.foreground_job() else {
        return Ok(());
    };
    let Some(pgid) = job.pgid() else {
        return Ok(());
    };
    tracing::debug!(job = %job.id(), %pgid, signal = signal.as_str(), "forwarding signal");
    match killpg(pgid, signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(source) => Err(ShellError::Signal {
            signal: signal.as_str(),
            target: format!("job {}", job.id()),
            source,
        }),
    }
}

/// Act on every notification recorded since the last call.
///
/// Call with an [`EventBlock`] held. Returns the transitions applied by
/// reaping, in the order the kernel reported them.
pub fn dispatch(jobs: &mut JobRegistry) -> Vec<Transition> {
    let transitions = if CHILD_PENDING.swap(false, Ordering::SeqCst) {
        reap_children(jobs)
    } else {
        Vec::new()
    };

    for (flag, signal) in [
        (&INTERRUPT_PENDING, Signal::SIGINT),
        (&SUSPEND_PENDING, Signal::SIGTSTP),
    ] {
        if flag.swap(false, Ordering::SeqCst) {
            if let Err(e) = forward_to_foreground(jobs, signal) {
                tracing::warn!("{}", e);
            }
        }
    }

    transitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_set_covers_notifications_only() {
        let set = event_set();
        assert!(set.contains(Signal::SIGCHLD));
        assert!(set.contains(Signal::SIGINT));
        assert!(set.contains(Signal::SIGTSTP));
        assert!(!set.contains(Signal::SIGQUIT));
    }

    #[test]
    fn wait_status_mapping() {
        let pid = Pid::from_raw(42);
        assert_eq!(
            state_of(WaitStatus::Exited(pid, 0)),
            Some((pid, ProcessState::Terminated))
        );
        assert_eq!(
            state_of(WaitStatus::Signaled(pid, Signal::SIGKILL, false)),
            Some((pid, ProcessState::Terminated))
        );
        assert_eq!(
            state_of(WaitStatus::Stopped(pid, Signal::SIGTSTP)),
            Some((pid, ProcessState::Stopped))
        );
        assert_eq!(state_of(WaitStatus::Continued(pid)), Some((pid, ProcessState::Running)));
        assert_eq!(state_of(WaitStatus::StillAlive), None);
    }

    #[test]
    fn forwarding_without_foreground_job_is_a_noop() {
        let jobs = JobRegistry::new();
        assert!(forward_to_foreground(&jobs, Signal::SIGINT).is_ok());
    }
}
