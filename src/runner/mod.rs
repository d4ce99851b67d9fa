//! Inference process runner.
//!
//! A launcher starts the inference program and hands back two channels: the
//! lines the model prints, and the failures seen while setting up, reading or
//! waiting on the process. Both channels close on their own once the process
//! is done, whatever the outcome.

pub mod process;

use crate::config::RunnerConfig;
use crate::prompt::Prompt;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

pub use process::ProcessLauncher;

/// Capacity of the output line channel.
pub const LINE_BUFFER: usize = 64;

/// Capacity of the error channel.
pub const ERROR_BUFFER: usize = 4;

/// Failures published on the error channel.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("could not open stdin pipe for {program}")]
    StdinPipe { program: String },
    #[error("could not open stdout pipe for {program}")]
    StdoutPipe { program: String },
    #[error("could not start {program}: {source}")]
    Start {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read model output: {0}")]
    Scan(#[source] std::io::Error),
    #[error("{program} failed ({status})")]
    Exit { program: String, status: ExitStatus },
    #[error("could not wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {}s", .after.as_secs())]
    TimedOut { program: String, after: Duration },
}

/// The two sequences produced by one launch.
#[derive(Debug)]
pub struct InferenceStreams {
    /// Output lines, in the order the process printed them.
    pub lines: mpsc::Receiver<String>,
    /// Failures; may carry more than one item.
    pub errors: mpsc::Receiver<RunnerError>,
}

impl InferenceStreams {
    /// Create connected sender halves and the streams they feed.
    pub fn channel() -> (
        mpsc::Sender<String>,
        mpsc::Sender<RunnerError>,
        InferenceStreams,
    ) {
        let (line_tx, lines) = mpsc::channel(LINE_BUFFER);
        let (error_tx, errors) = mpsc::channel(ERROR_BUFFER);
        (line_tx, error_tx, InferenceStreams { lines, errors })
    }
}

/// Starts an inference run for a composed prompt.
///
/// Implementations must not block: the work happens in background tasks and
/// is observed through the returned streams. Must be called from within a
/// tokio runtime.
pub trait Launcher {
    fn launch(&self, runner: &RunnerConfig, prompt: &Prompt) -> InferenceStreams;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_exit_message() {
        use std::os::unix::process::ExitStatusExt;

        let err = RunnerError::Exit {
            program: "sh".to_string(),
            status: ExitStatus::from_raw(2 << 8),
        };
        assert_eq!(err.to_string(), "sh failed (exit status: 2)");
    }

    #[test]
    fn test_messages_read_after_error_prefix() {
        let errors = [
            RunnerError::StdinPipe {
                program: "ollama".to_string(),
            },
            RunnerError::Start {
                program: "ollama".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
            RunnerError::Scan(std::io::Error::other("boom")),
            RunnerError::TimedOut {
                program: "ollama".to_string(),
                after: Duration::from_secs(3),
            },
        ];
        // main prints these as "Error: <message>".
        for err in errors {
            let message = err.to_string();
            assert!(!message.to_lowercase().starts_with("error"), "{message}");
        }
    }
}
