//! jobsh REPL: the line-reading front end for the job-control shell.
//!
//! It handles:
//! - Prompting and line editing via rustyline when stdin is a terminal
//! - Plain line reading from pipes and script files
//! - Command history (load on start, save on exit)
//! - Reporting command errors on stderr without leaving the loop

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Cmd, Editor, KeyEvent};

use jobsh_kernel::{ErrorKind, Flow, Shell, ShellConfig, ShellError, ShellResult};

/// REPL state: one shell session.
pub struct Repl {
    shell: Shell,
}

impl Repl {
    /// Create a REPL and the shell session behind it.
    pub fn new(config: ShellConfig) -> Result<Self> {
        let shell = Shell::new(config).context("Failed to initialize shell")?;
        Ok(Self { shell })
    }

    /// The shell session.
    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// Execute one line, returning the shell's error instead of printing it.
    pub fn execute(&mut self, line: &str) -> ShellResult<Flow> {
        self.shell.execute(line)
    }

    /// Execute one line. Errors are printed on stderr and the loop continues.
    pub fn process_line(&mut self, line: &str) -> Flow {
        match self.shell.execute(line) {
            Ok(flow) => flow,
            Err(e) => {
                report(&e);
                Flow::Continue
            }
        }
    }

    /// Run until `quit`, `exit`, or end of input.
    pub fn run(&mut self) -> Result<()> {
        if self.shell.is_interactive() {
            self.run_interactive()
        } else {
            self.run_lines(std::io::stdin().lock())
        }
    }

    /// Run every line from `reader` without prompting.
    ///
    /// Lines starting with `#` are comments, which also skips a shebang line.
    pub fn run_lines(&mut self, reader: impl BufRead) -> Result<()> {
        for line in reader.lines() {
            let line = line.context("Failed to read input")?;
            if line.trim_start().starts_with('#') {
                continue;
            }
            if self.process_line(&line) == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    /// Run the commands in a script file.
    pub fn run_script(&mut self, path: &Path) -> Result<()> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;
        self.run_lines(std::io::BufReader::new(file))
    }

    fn run_interactive(&mut self) -> Result<()> {
        let mut rl: Editor<(), DefaultHistory> =
            Editor::new().context("Failed to create editor")?;
        // The shell's own Ctrl-Z is meaningless at the prompt.
        rl.bind_sequence(KeyEvent::ctrl('Z'), Cmd::Noop);

        let history_path = self.shell.config().history_path();
        load_history(&mut rl, history_path.as_deref());

        loop {
            self.shell.poll();
            let prompt = self.shell.config().prompt.clone();

            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        if let Err(e) = rl.add_history_entry(line.as_str()) {
                            tracing::warn!("Failed to add history entry: {}", e);
                        }
                    }
                    if self.process_line(&line) == Flow::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {}", err);
                    break;
                }
            }
        }

        save_history(&mut rl, history_path.as_deref());
        Ok(())
    }
}

/// Print a command error the way the shell reports it.
fn report(error: &ShellError) {
    match error.kind() {
        ErrorKind::Usage | ErrorKind::Lookup => eprintln!("{}", error),
        ErrorKind::Syntax | ErrorKind::Resource => eprintln!("jobsh: {}", error),
    }
}

fn load_history(rl: &mut Editor<(), DefaultHistory>, path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if let Err(e) = rl.load_history(path) {
        // Not found is expected on first run.
        let is_not_found = matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound);
        if !is_not_found {
            tracing::warn!("Failed to load history: {}", e);
        }
    }
}

/// Save REPL history to disk.
fn save_history(rl: &mut Editor<(), DefaultHistory>, path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create history directory: {}", e);
        }
    }
    if let Err(e) = rl.save_history(path) {
        tracing::warn!("Failed to save history: {}", e);
    }
}

/// Resolve the configuration: an explicit file if given, else the default location.
pub fn load_config(path: Option<&PathBuf>) -> Result<ShellConfig> {
    match path {
        Some(path) => ShellConfig::load_from(path),
        None => ShellConfig::load(),
    }
}
