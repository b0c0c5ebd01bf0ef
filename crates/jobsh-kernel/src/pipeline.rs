//! Pipeline descriptors.
//!
//! A [`Pipeline`] is what the parser hands to the launcher: ordered stages
//! plus optional redirections and the background flag.

use std::fmt;
use std::path::PathBuf;

/// One pipeline stage: a program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Program name, looked up in PATH at exec time.
    pub program: String,
    /// Arguments, not including the program name.
    pub args: Vec<String>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Full argument vector: program name followed by arguments.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    /// Stages in order; stdout of stage N feeds stdin of stage N+1.
    pub commands: Vec<Command>,
    /// File connected to the first stage's stdin.
    pub input: Option<PathBuf>,
    /// File connected to the last stage's stdout (created/truncated, mode 0644).
    pub output: Option<PathBuf>,
    /// Run without blocking the shell.
    pub background: bool,
}

impl Pipeline {
    /// Single-stage foreground pipeline.
    pub fn single(command: Command) -> Self {
        Self { commands: vec![command], ..Self::default() }
    }

    /// Append a stage.
    pub fn pipe(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn in_background(mut self) -> Self {
        self.background = true;
        self
    }

    /// The leading command's program name (used for builtin lookup).
    pub fn leader(&self) -> Option<&str> {
        self.commands.first().map(|c| c.program.as_str())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", cmd)?;
        }
        if let Some(input) = &self.input {
            write!(f, " < {}", input.display())?;
        }
        if let Some(output) = &self.output {
            write!(f, " > {}", output.display())?;
        }
        if self.background {
            write!(f, " &")?;
        }
        Ok(())
    }
}
