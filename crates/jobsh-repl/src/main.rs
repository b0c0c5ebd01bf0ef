//! jobsh CLI entry point.
//!
//! Usage:
//!   jobsh                      # Interactive shell (or read commands from piped stdin)
//!   jobsh -c <command>         # Execute one command line and exit
//!   jobsh script.jsh           # Run each line of a script

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobsh_repl::{load_config, Repl};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var); stdout belongs to jobs.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// What the command line asked for.
enum Mode {
    Interactive,
    Command(String),
    Script(PathBuf),
}

struct Options {
    mode: Mode,
    config: Option<PathBuf>,
    history: bool,
}

fn run() -> Result<ExitCode> {
    let mut args = env::args().skip(1);
    let mut options = Options {
        mode: Mode::Interactive,
        config: None,
        history: true,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(ExitCode::SUCCESS);
            }
            "--version" | "-V" => {
                println!(
                    "jobsh {} ({} {}, {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("JOBSH_GIT_HASH"),
                    env!("JOBSH_BUILD_DATE"),
                    env!("JOBSH_BUILD_TARGET")
                );
                return Ok(ExitCode::SUCCESS);
            }
            "-c" => {
                let cmd = args.next().context("-c requires a command argument")?;
                options.mode = Mode::Command(cmd);
            }
            "--no-history" => options.history = false,
            "--config" => {
                let path = args.next().context("--config requires a file path")?;
                options.config = Some(PathBuf::from(path));
            }
            path if !path.starts_with('-') => options.mode = Mode::Script(PathBuf::from(path)),
            unknown => {
                eprintln!("Unknown option: {unknown}");
                eprintln!("Run 'jobsh --help' for usage.");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let config = load_config(options.config.as_ref())?;
    let config = if options.history { config } else { config.with_history(false) };
    let mut repl = Repl::new(config)?;

    match options.mode {
        Mode::Interactive => repl.run()?,
        Mode::Script(path) => repl.run_script(&path)?,
        Mode::Command(cmd) => {
            if let Err(e) = repl.execute(&cmd) {
                bail!("{}", e);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_help() {
    println!(
        r#"jobsh v{}

Usage:
  jobsh                        Interactive shell
  jobsh -c <command>           Execute one command line and exit
  jobsh <script>               Run each line of a script file

Options:
  -c <command>                 Execute command line and exit
  --config <path>              Read configuration from <path>
  --no-history                 Don't load or save line history
  -h, --help                   Show this help
  -V, --version                Show version

Builtins:
  quit, exit                   Leave the shell
  fg <jobid>                   Continue a job in the foreground
  bg <jobid>                   Continue a job in the background
  slay <jobid> <index> | <pid> Kill a process
  halt <jobid> <index> | <pid> Stop a process
  cont <jobid> <index> | <pid> Continue a process
  jobs                         List jobs
"#,
        env!("CARGO_PKG_VERSION")
    );
}
