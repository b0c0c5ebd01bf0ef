//! Pipeline launcher: turns a [`Pipeline`] into a job of forked processes.
//!
//! # Process setup
//!
//! ```text
//!            stage 0            stage 1            stage 2
//! input ──▶ [ fork ] ──pipe──▶ [ fork ] ──pipe──▶ [ fork ] ──▶ output
//!              │                  │                  │
//!              └──── setpgid(child, pgid of stage 0) ┘
//! ```
//!
//! Both parent and child call `setpgid` so the group exists before either
//! side relies on it. Every pipe is created close-on-exec and the parent
//! closes each end as soon as the next stage has been forked, so a stage sees
//! end-of-file exactly when its writer exits.
//!
//! Notifications stay blocked for the whole setup: the registry must know
//! about a child before that child's status change can be reaped.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd::{dup2, execvp, fork, pipe2, setpgid, write, ForkResult, Pid};

use jobsh_types::{JobId, Placement};

use crate::context::ExecContext;
use crate::error::{ShellError, ShellResult};
use crate::notify::{self, EventBlock};
use crate::pipeline::{Command, Pipeline};

/// Exit status of a child whose program could not be executed.
pub const EXEC_FAILURE_STATUS: i32 = 127;

/// A stage's argument vector, converted before fork so the child allocates nothing.
struct PreparedStage {
    program: CString,
    argv: Vec<CString>,
    text: String,
}

impl PreparedStage {
    fn new(command: &Command) -> ShellResult<Self> {
        let argv = command
            .argv()
            .map(|arg| {
                CString::new(arg).map_err(|_| {
                    ShellError::InvalidArgument(format!("{:?} contains a NUL byte", arg))
                })
            })
            .collect::<ShellResult<Vec<_>>>()?;
        Ok(Self {
            program: argv[0].clone(),
            argv,
            text: command.to_string(),
        })
    }
}

fn open_input(path: &Path) -> ShellResult<File> {
    File::open(path).map_err(|source| ShellError::Redirect {
        path: path.to_path_buf(),
        source,
    })
}

fn open_output(path: &Path) -> ShellResult<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
        .map_err(|source| ShellError::Redirect {
            path: path.to_path_buf(),
            source,
        })
}

/// Launch `pipeline` as a new job and return its handle.
///
/// A foreground job is given the terminal but not waited for; callers follow
/// up with [`crate::foreground::wait_for_foreground`]. A background job's
/// summary line (`[N] pid pid`) is printed here.
#[tracing::instrument(level = "debug", skip_all, fields(line = %pipeline))]
pub fn launch(ctx: &mut ExecContext, pipeline: &Pipeline) -> ShellResult<JobId> {
    if pipeline.commands.is_empty() {
        return Err(ShellError::Parse("empty pipeline".into()));
    }

    // Everything that can fail without side effects happens before the job exists.
    let mut input = pipeline.input.as_deref().map(open_input).transpose()?;
    let mut output = pipeline.output.as_deref().map(open_output).transpose()?;
    let stages = pipeline
        .commands
        .iter()
        .map(PreparedStage::new)
        .collect::<ShellResult<Vec<_>>>()?;

    let placement = if pipeline.background {
        Placement::Background
    } else {
        Placement::Foreground
    };

    let _block = EventBlock::new()?;
    let id = ctx.jobs.add_job(placement).id();

    if let Err(e) = spawn_stages(ctx, id, &stages, &mut input, &mut output) {
        // Stages that did start keep running under the job; an empty job is dropped.
        if !ctx.jobs.synchronize(id) {
            ctx.jobs.set_placement(id, Placement::Background)?;
        }
        return Err(e);
    }

    let job = ctx.jobs.job(id)?;
    if pipeline.background {
        println!("{}", job);
    } else if let Some(pgid) = job.pgid() {
        if let Err(e) = ctx.terminal.give_to(pgid) {
            ctx.jobs.set_placement(id, Placement::Background)?;
            return Err(e);
        }
    }
    Ok(id)
}

fn spawn_stages(
    ctx: &mut ExecContext,
    id: JobId,
    stages: &[PreparedStage],
    input: &mut Option<File>,
    output: &mut Option<File>,
) -> ShellResult<()> {
    let last = stages.len() - 1;
    // Read end feeding the next stage, carried across iterations.
    let mut upstream: Option<OwnedFd> = input.take().map(OwnedFd::from);

    for (index, stage) in stages.iter().enumerate() {
        let (reader, writer) = if index < last {
            let (r, w) = pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)?;
            (Some(r), Some(w))
        } else {
            (None, output.take().map(OwnedFd::from))
        };

        let pgid = ctx.jobs.job(id)?.pgid();
        let stdin_fd = upstream.as_ref().map(AsRawFd::as_raw_fd);
        let stdout_fd = writer.as_ref().map(AsRawFd::as_raw_fd);

        // SAFETY: the child only calls async-signal-safe functions before exec
        // or _exit; every allocation it needs was made above.
        match unsafe { fork() }.map_err(ShellError::Fork)? {
            ForkResult::Child => run_child(stage, pgid, stdin_fd, stdout_fd),
            ForkResult::Parent { child } => {
                join_group(child, pgid.unwrap_or(child));
                ctx.jobs.add_process(id, child, stage.text.as_str())?;
                tracing::debug!(job = %id, %child, stage = index, command = %stage.text, "forked stage");
            }
        }

        // This stage owns its ends now; the parent closes them immediately.
        drop(writer);
        upstream = reader;
    }

    Ok(())
}

fn join_group(child: Pid, pgid: Pid) {
    // The child may already have exec'd (EACCES) or exited (ESRCH); its own
    // setpgid call covers both cases.
    match setpgid(child, pgid) {
        Ok(()) | Err(Errno::EACCES) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(%child, %pgid, "setpgid failed: {}", e),
    }
}

/// Child side of the fork. Never returns.
fn run_child(
    stage: &PreparedStage,
    pgid: Option<Pid>,
    stdin_fd: Option<RawFd>,
    stdout_fd: Option<RawFd>,
) -> ! {
    notify::reset_for_child();
    let _ = setpgid(Pid::from_raw(0), pgid.unwrap_or(Pid::from_raw(0)));

    if let Some(fd) = stdin_fd {
        if dup2(fd, libc::STDIN_FILENO).is_err() {
            exit_child();
        }
    }
    if let Some(fd) = stdout_fd {
        if dup2(fd, libc::STDOUT_FILENO).is_err() {
            exit_child();
        }
    }

    // Only returns on failure. The pipe and redirect descriptors are
    // close-on-exec or dropped with the parent's copies of this image.
    let _ = execvp(&stage.program, &stage.argv);

    // Unbuffered, lock-free writes straight to fd 2.
    let _ = write(std::io::stderr(), stage.program.as_bytes());
    let _ = write(std::io::stderr(), b": Command not found.\n");
    exit_child();
}

fn exit_child() -> ! {
    // SAFETY: _exit skips atexit handlers and stdio flushing, so the child
    // never runs the parent's cleanup on its copy of the image.
    unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
}
