//! Launcher and job lifecycle tests against real child processes.
//!
//! Every test here forks and reaps with `waitpid(-1)`, so they share one lock
//! to keep children of concurrent tests from being reaped by the wrong test.
//! Foreground jobs only run inside a forked child that owns a pseudo-terminal;
//! the rest of foreground behavior is covered by the repl's end-to-end tests.

use std::fs;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use nix::fcntl::OFlag;
use nix::pty::{grantpt, posix_openpt, ptsname_r, unlockpt};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2, fork, setsid, ForkResult, Pid};

use jobsh_kernel::builtins::BuiltinRegistry;
use jobsh_kernel::foreground::wait_for_foreground;
use jobsh_kernel::launcher::launch;
use jobsh_kernel::notify::{install_handlers, reap_children};
use jobsh_kernel::parser::parse;
use jobsh_kernel::{ErrorKind, ExecContext, JobId, Placement, ProcessState, ShellConfig, ShellError};

static FORK_LOCK: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    FORK_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn context() -> ExecContext {
    ExecContext::new(ShellConfig::default())
}

fn spawn(ctx: &mut ExecContext, line: &str) -> JobId {
    let pipeline = parse(line).expect("parse");
    launch(ctx, &pipeline).expect("launch")
}

fn run_builtin(ctx: &mut ExecContext, line: &str) -> Result<(), ShellError> {
    let builtins = BuiltinRegistry::with_defaults();
    let pipeline = parse(line).expect("parse");
    let cmd = &pipeline.commands[0];
    builtins
        .get(&cmd.program)
        .expect("builtin")
        .execute(&cmd.args, ctx)
        .map(|_| ())
}

/// Reap until `done` holds, failing after a generous deadline.
fn reap_until(ctx: &mut ExecContext, what: &str, done: impl Fn(&ExecContext) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        reap_children(&mut ctx.jobs);
        if done(ctx) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(10));
    }
}

fn reap_job(ctx: &mut ExecContext, id: JobId) {
    reap_until(ctx, "job to finish", |ctx| !ctx.jobs.contains_job(id));
}

fn process_state(ctx: &ExecContext, id: JobId, index: usize) -> ProcessState {
    ctx.jobs.job(id).unwrap().process_at(index).unwrap().state()
}

/// Whether the kernel reports `pid` as a zombie (exited, not yet reaped).
fn is_zombie(pid: i32) -> bool {
    fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| stat.rsplit_once(')').map(|(_, rest)| rest.trim_start().starts_with('Z')))
        .unwrap_or(false)
}

fn open_fds() -> usize {
    fs::read_dir("/proc/self/fd").map(|dir| dir.count()).unwrap_or(0)
}

// ============================================================================
// Background jobs
// ============================================================================

#[test]
fn background_job_is_registered_then_removed() {
    let _lock = serial();
    let mut ctx = context();

    let id = spawn(&mut ctx, "sleep 0.2 &");
    assert_eq!(id, JobId(1));

    let job = ctx.jobs.job(id).unwrap();
    assert_eq!(job.placement(), Placement::Background);
    assert_eq!(job.processes().len(), 1);
    assert_eq!(job.pgid(), Some(job.processes()[0].pid()));
    assert!(!ctx.jobs.has_foreground_job());

    reap_job(&mut ctx, id);
    assert!(ctx.jobs.is_empty());

    // The handle is free again.
    let again = spawn(&mut ctx, "true &");
    assert_eq!(again, JobId(1));
    reap_job(&mut ctx, again);
}

#[test]
fn pipeline_stages_share_a_process_group() {
    let _lock = serial();
    let mut ctx = context();

    let id = spawn(&mut ctx, "sleep 1 | sleep 1 | sleep 1 &");
    let job = ctx.jobs.job(id).unwrap();
    let pgid = job.pgid().unwrap();
    assert_eq!(job.processes().len(), 3);
    for process in job.processes() {
        let actual = nix::unistd::getpgid(Some(process.pid())).unwrap();
        assert_eq!(actual, pgid);
    }
    assert_eq!(job.command(), "sleep 1 | sleep 1 | sleep 1");

    reap_job(&mut ctx, id);
}

#[test]
fn three_stage_pass_through_preserves_data() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    let data: String = (0..2000).map(|i| format!("line {}\n", i)).collect();
    fs::write(&input, &data).unwrap();

    let mut ctx = context();
    let line = format!("cat < {} | cat | cat > {} &", input.display(), output.display());
    let id = spawn(&mut ctx, &line);
    reap_job(&mut ctx, id);

    assert_eq!(fs::read_to_string(&output).unwrap(), data);
}

#[test]
fn output_redirect_truncates_existing_file() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");
    fs::write(&output, "stale contents that are longer than the new output\n").unwrap();

    let mut ctx = context();
    let id = spawn(&mut ctx, &format!("echo fresh > {} &", output.display()));
    reap_job(&mut ctx, id);

    assert_eq!(fs::read_to_string(&output).unwrap(), "fresh\n");
}

#[test]
fn launching_leaks_no_descriptors() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    fs::write(&input, "abc\n").unwrap();

    let mut ctx = context();
    let before = open_fds();
    let line = format!(
        "cat < {} | cat | cat > {} &",
        input.display(),
        dir.path().join("out.txt").display()
    );
    let id = spawn(&mut ctx, &line);
    assert_eq!(open_fds(), before);
    reap_job(&mut ctx, id);
    assert_eq!(open_fds(), before);
}

#[test]
fn coalesced_exits_are_all_reaped() {
    let _lock = serial();
    let mut ctx = context();

    let first = spawn(&mut ctx, "true &");
    let second = spawn(&mut ctx, "true &");
    let pids: Vec<i32> = [first, second]
        .iter()
        .map(|id| ctx.jobs.job(*id).unwrap().processes()[0].pid().as_raw())
        .collect();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !pids.iter().all(|pid| is_zombie(*pid)) {
        assert!(Instant::now() < deadline, "children never exited");
        thread::sleep(Duration::from_millis(10));
    }

    let transitions = reap_children(&mut ctx.jobs);
    assert_eq!(transitions.len(), 2);
    assert!(transitions.iter().all(|t| t.state == ProcessState::Terminated));
    assert!(ctx.jobs.is_empty());
}

#[test]
fn missing_command_terminates_only_the_child() {
    let _lock = serial();
    let mut ctx = context();

    let id = spawn(&mut ctx, "jobsh-no-such-program-xyz &");
    assert!(ctx.jobs.contains_job(id));
    reap_job(&mut ctx, id);
    assert!(ctx.jobs.is_empty());
}

#[test]
fn missing_input_fails_before_anything_is_spawned() {
    let _lock = serial();
    let mut ctx = context();

    let pipeline = parse("cat < /definitely/not/a/file | wc -l &").unwrap();
    let err = launch(&mut ctx, &pipeline).unwrap_err();
    assert!(matches!(err, ShellError::Redirect { .. }));
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert!(ctx.jobs.is_empty());
    assert!(reap_children(&mut ctx.jobs).is_empty());
}

// ============================================================================
// Signalling builtins
// ============================================================================

#[test]
fn halt_cont_slay_drive_process_state() {
    let _lock = serial();
    let mut ctx = context();
    let id = spawn(&mut ctx, "sleep 30 &");
    let pid = ctx.jobs.job(id).unwrap().processes()[0].pid().as_raw();

    run_builtin(&mut ctx, "halt 1 0").unwrap();
    reap_until(&mut ctx, "process to stop", |ctx| {
        process_state(ctx, id, 0) == ProcessState::Stopped
    });
    assert!(ctx.jobs.job(id).unwrap().is_stopped());

    // Already stopped: nothing is sent, nothing changes.
    run_builtin(&mut ctx, &format!("halt {}", pid)).unwrap();
    assert!(reap_children(&mut ctx.jobs).is_empty());
    assert_eq!(process_state(&ctx, id, 0), ProcessState::Stopped);

    run_builtin(&mut ctx, &format!("cont {}", pid)).unwrap();
    reap_until(&mut ctx, "process to continue", |ctx| {
        process_state(ctx, id, 0) == ProcessState::Running
    });

    // Already running: no-op.
    run_builtin(&mut ctx, "cont 1 0").unwrap();
    assert_eq!(process_state(&ctx, id, 0), ProcessState::Running);

    run_builtin(&mut ctx, "slay 1 0").unwrap();
    reap_job(&mut ctx, id);
}

#[test]
fn bad_targets_change_nothing() {
    let _lock = serial();
    let mut ctx = context();
    let id = spawn(&mut ctx, "sleep 30 &");

    let err = run_builtin(&mut ctx, "slay 1 1").unwrap_err();
    assert_eq!(err.to_string(), "Job 1 doesn't have a process at index 1.");
    let err = run_builtin(&mut ctx, "slay 7 0").unwrap_err();
    assert_eq!(err.to_string(), "No job with id of 7.");
    let err = run_builtin(&mut ctx, "slay 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);

    assert_eq!(process_state(&ctx, id, 0), ProcessState::Running);
    assert_eq!(ctx.jobs.len(), 1);

    run_builtin(&mut ctx, "slay 1 0").unwrap();
    reap_job(&mut ctx, id);
}

#[test]
fn bg_keeps_job_in_background_and_continues_it() {
    let _lock = serial();
    let mut ctx = context();
    let id = spawn(&mut ctx, "sleep 30 &");

    run_builtin(&mut ctx, "halt 1 0").unwrap();
    reap_until(&mut ctx, "process to stop", |ctx| {
        process_state(ctx, id, 0) == ProcessState::Stopped
    });

    run_builtin(&mut ctx, "bg 1").unwrap();
    reap_until(&mut ctx, "job to continue", |ctx| {
        process_state(ctx, id, 0) == ProcessState::Running
    });
    assert_eq!(ctx.jobs.job(id).unwrap().placement(), Placement::Background);

    run_builtin(&mut ctx, "slay 1 0").unwrap();
    reap_job(&mut ctx, id);
}

#[test]
fn finished_stage_is_no_longer_a_target() {
    let _lock = serial();
    let mut ctx = context();
    let id = spawn(&mut ctx, "sleep 30 | true &");
    let finished = ctx.jobs.job(id).unwrap().processes()[1].pid().as_raw();

    reap_until(&mut ctx, "second stage to finish", |ctx| {
        process_state(ctx, id, 1) == ProcessState::Terminated
    });
    assert!(ctx.jobs.contains_job(id));

    // Its pid is free for reuse, so nothing may be sent to it.
    for line in [
        "slay 1 1".to_string(),
        format!("halt {}", finished),
        format!("cont {}", finished),
    ] {
        let err = run_builtin(&mut ctx, &line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert_eq!(err.to_string(), format!("No process with pid {}.", finished));
    }
    assert_eq!(process_state(&ctx, id, 0), ProcessState::Running);

    run_builtin(&mut ctx, "slay 1 0").unwrap();
    reap_job(&mut ctx, id);
}

// ============================================================================
// Terminal ownership
// ============================================================================

fn check_owner(ctx: &ExecContext, expected: Pid, when: &str) -> Result<(), String> {
    match ctx.terminal.owner() {
        Some(owner) if owner == expected => Ok(()),
        other => Err(format!("{}: terminal owned by {:?}, expected {}", when, other, expected)),
    }
}

/// Body of a forked child that leads a new session on `tty`. Launches a
/// foreground job, then brings a background job forward with `fg`, checking
/// who owns the terminal at each step. Must not panic: it runs in a copy of
/// the test harness.
fn terminal_round_trip(tty: &str) -> Result<(), String> {
    setsid().map_err(|e| format!("setsid: {}", e))?;
    // Opened by a session leader, the slave becomes the controlling terminal.
    let tty = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(tty)
        .map_err(|e| format!("open {}: {}", tty, e))?;
    dup2(tty.as_raw_fd(), libc::STDIN_FILENO).map_err(|e| format!("dup2: {}", e))?;
    install_handlers().map_err(|e| e.to_string())?;

    let mut ctx = context();
    let shell = ctx.terminal.shell_pgid();
    if !ctx.terminal.is_interactive() {
        return Err("stdin is not a terminal".into());
    }
    check_owner(&ctx, shell, "at start")?;

    let pipeline = parse("sleep 0.3").map_err(|e| e.to_string())?;
    let id = launch(&mut ctx, &pipeline).map_err(|e| e.to_string())?;
    let pgid = ctx
        .jobs
        .job(id)
        .map_err(|e| e.to_string())?
        .pgid()
        .ok_or("foreground job has no process group")?;
    check_owner(&ctx, pgid, "foreground job running")?;
    wait_for_foreground(&mut ctx, id).map_err(|e| e.to_string())?;
    if !ctx.jobs.is_empty() {
        return Err("foreground job still registered after it finished".into());
    }
    check_owner(&ctx, shell, "after foreground job")?;

    let pipeline = parse("sleep 0.3 &").map_err(|e| e.to_string())?;
    launch(&mut ctx, &pipeline).map_err(|e| e.to_string())?;
    check_owner(&ctx, shell, "background job running")?;

    let builtins = BuiltinRegistry::with_defaults();
    let fg = builtins.get("fg").ok_or("fg is not registered")?;
    fg.execute(&["1".to_string()], &mut ctx).map_err(|e| e.to_string())?;
    if !ctx.jobs.is_empty() {
        return Err("job brought forward by fg still registered".into());
    }
    check_owner(&ctx, shell, "after fg")
}

#[test]
fn terminal_returns_to_the_shell_after_foreground_jobs() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let failure = dir.path().join("failure.txt");

    let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).unwrap();
    grantpt(&master).unwrap();
    unlockpt(&master).unwrap();
    let tty = ptsname_r(&master).unwrap();

    match unsafe { fork() }.unwrap() {
        ForkResult::Child => {
            let code = match terminal_round_trip(&tty) {
                Ok(()) => 0,
                Err(message) => {
                    let _ = fs::write(&failure, message);
                    1
                }
            };
            // SAFETY: leave without running the harness's copy of its cleanup.
            unsafe { libc::_exit(code) }
        }
        ForkResult::Parent { child } => {
            let status = waitpid(child, None).unwrap();
            let message = failure_message(&failure);
            assert_eq!(status, WaitStatus::Exited(child, 0), "{}", message);
        }
    }
    drop(master);
}

fn failure_message(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}
