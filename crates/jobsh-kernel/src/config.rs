//! Shell configuration.
//!
//! Configuration is loaded from `~/.config/jobsh/config.toml`. A missing file
//! yields the defaults; command-line flags are applied on top by the REPL.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

/// Configuration for a jobsh session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Prompt printed before each interactive line.
    pub prompt: String,

    /// Whether interactive sessions load and save line history.
    pub history: bool,

    /// History file location. Defaults to `<data dir>/jobsh/history.txt`.
    pub history_file: Option<PathBuf>,

    /// When every process of the foreground job stops, hand the terminal back
    /// to the shell and move the job to the background.
    ///
    /// When false, a stopped job keeps foreground placement and the shell
    /// keeps waiting until it terminates or is displaced.
    pub stop_releases_foreground: bool,

    /// Print `[N]+ Stopped <cmd>` when a foreground job is released because
    /// it stopped.
    pub announce_stopped: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "jobsh> ".to_string(),
            history: true,
            history_file: None,
            stop_releases_foreground: false,
            announce_stopped: true,
        }
    }
}

impl ShellConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            tracing::debug!("no config directory available, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Default config file path (`~/.config/jobsh/config.toml`).
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "jobsh").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolved history file path, if history is enabled.
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.history {
            return None;
        }
        self.history_file.clone().or_else(|| {
            ProjectDirs::from("", "", "jobsh").map(|dirs| dirs.data_dir().join("history.txt"))
        })
    }

    /// Set the interactive prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Enable or disable line history.
    pub fn with_history(mut self, history: bool) -> Self {
        self.history = history;
        self
    }

    /// Choose whether a stopped foreground job releases the terminal.
    pub fn with_stop_releases_foreground(mut self, release: bool) -> Self {
        self.stop_releases_foreground = release;
        self
    }
}
