//! Test-only launchers and sinks.

use crate::config::RunnerConfig;
use crate::multiplexer::LineSink;
use crate::prompt::Prompt;
use crate::runner::{InferenceStreams, Launcher, RunnerError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Sink that keeps every forwarded line.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub lines: Vec<String>,
}

#[async_trait]
impl LineSink for RecordingSink {
    async fn forward(&mut self, line: &str) -> std::io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Launcher that records every prompt and replays canned output.
#[derive(Debug, Default)]
pub struct SpyLauncher {
    lines: Vec<String>,
    fail_with: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl SpyLauncher {
    /// Replay `lines`, then close both channels.
    pub fn emitting(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Replay `lines`, then publish a pipe failure for `program`.
    pub fn failing(lines: &[&str], program: &str) -> Self {
        Self {
            fail_with: Some(program.to_string()),
            ..Self::emitting(lines)
        }
    }

    /// Prompts passed to `launch`, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl Launcher for SpyLauncher {
    fn launch(&self, _runner: &RunnerConfig, prompt: &Prompt) -> InferenceStreams {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let (line_tx, error_tx, streams) = InferenceStreams::channel();
        let lines = self.lines.clone();
        let fail_with = self.fail_with.clone();
        tokio::spawn(async move {
            for line in lines {
                if line_tx.send(line).await.is_err() {
                    return;
                }
            }
            drop(line_tx);
            if let Some(program) = fail_with {
                let _ = error_tx
                    .send(RunnerError::StdoutPipe { program })
                    .await;
            }
        });
        streams
    }
}
