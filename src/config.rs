//! Configuration management for codellm.
//!
//! Configuration is loaded from `~/.config/codellm/config.toml`. Every value
//! has a default, so the file is optional.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// How the inference process is launched.
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Prompt composition settings.
    #[serde(default)]
    pub prompt: PromptConfig,
    /// Where the response is persisted.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Inference process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Program to execute (default: ollama).
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the model name (default: ["run"]).
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Model name passed as the last argument (default: llama3).
    #[serde(default = "default_model")]
    pub model: String,
    /// Kill the process after this many seconds. Absent or 0 disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            model: default_model(),
            timeout_secs: None,
        }
    }
}

impl RunnerConfig {
    /// Configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn default_program() -> String {
    "ollama".to_string()
}

fn default_args() -> Vec<String> {
    vec!["run".to_string()]
}

fn default_model() -> String {
    "llama3".to_string()
}

/// Prompt composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Literal placed directly before the file contents.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    crate::prompt::DEFAULT_PREFIX.to_string()
}

/// Output persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Log file the full response is written to (overwritten each run).
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("llama3_output.txt")
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("codellm"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Per-invocation overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Explicit model name (--model flag).
    pub model: Option<String>,
    /// Explicit program (--program flag).
    pub program: Option<String>,
    /// Explicit log path (--log flag).
    pub log_path: Option<PathBuf>,
    /// Explicit timeout in seconds (--timeout flag). 0 disables the timeout.
    pub timeout_secs: Option<u64>,
}

impl Overrides {
    /// Apply the overrides on top of a loaded config.
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(model) = self.model {
            config.runner.model = model;
        }
        if let Some(program) = self.program {
            config.runner.program = program;
        }
        if let Some(log_path) = self.log_path {
            config.output.log_path = log_path;
        }
        if let Some(secs) = self.timeout_secs {
            config.runner.timeout_secs = Some(secs);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.runner.program, "ollama");
        assert_eq!(config.runner.args, vec!["run".to_string()]);
        assert_eq!(config.runner.model, "llama3");
        assert_eq!(config.prompt.prefix, "The code is: ");
        assert_eq!(config.output.log_path, PathBuf::from("llama3_output.txt"));
        assert!(config.runner.timeout().is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("ollama"));
        assert!(toml.contains("llama3_output.txt"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
[runner]
program = "llamafile"
args = []
model = "mistral"
timeout_secs = 30

[output]
log_path = "/tmp/answer.txt"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.runner.program, "llamafile");
        assert!(config.runner.args.is_empty());
        assert_eq!(config.runner.model, "mistral");
        assert_eq!(config.runner.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.output.log_path, PathBuf::from("/tmp/answer.txt"));
        // Missing section falls back to defaults.
        assert_eq!(config.prompt.prefix, "The code is: ");
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = Config::from_toml("[runner]\ntimeout_secs = 0\n").unwrap();
        assert!(config.runner.timeout().is_none());
    }

    #[test]
    fn test_overrides_apply() {
        let overrides = Overrides {
            model: Some("codellama".to_string()),
            program: None,
            log_path: Some(PathBuf::from("out.log")),
            timeout_secs: Some(5),
        };
        let config = overrides.apply(Config::default());
        assert_eq!(config.runner.model, "codellama");
        assert_eq!(config.runner.program, "ollama");
        assert_eq!(config.output.log_path, PathBuf::from("out.log"));
        assert_eq!(config.runner.timeout(), Some(Duration::from_secs(5)));
    }
}
