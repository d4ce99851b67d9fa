//! Drain loop over the runner's two channels.
//!
//! Lines are forwarded to a [`LineSink`] as they arrive. The first error ends
//! the drain immediately, without waiting for the remaining output.

use crate::runner::{InferenceStreams, RunnerError};
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Destination for streamed output lines.
#[async_trait]
pub trait LineSink: Send {
    async fn forward(&mut self, line: &str) -> std::io::Result<()>;
}

/// Writes each line to stdout and flushes it right away.
pub struct ConsoleSink {
    out: tokio::io::Stdout,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            out: tokio::io::stdout(),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineSink for ConsoleSink {
    async fn forward(&mut self, line: &str) -> std::io::Result<()> {
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }
}

/// Why a drain stopped early.
#[derive(Debug, Error)]
pub enum DrainError {
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("could not write output: {0}")]
    Sink(#[source] std::io::Error),
}

/// Drain both channels until both have closed.
///
/// Returns every forwarded line, in order. Either channel may be the one that
/// makes progress on a given iteration; a closed channel is no longer polled.
pub async fn drain<S>(streams: InferenceStreams, sink: &mut S) -> Result<Vec<String>, DrainError>
where
    S: LineSink + ?Sized,
{
    let InferenceStreams {
        mut lines,
        mut errors,
    } = streams;
    let mut lines_open = true;
    let mut errors_open = true;
    let mut collected = Vec::new();

    while lines_open || errors_open {
        tokio::select! {
            line = lines.recv(), if lines_open => match line {
                Some(line) => {
                    sink.forward(&line).await.map_err(DrainError::Sink)?;
                    collected.push(line);
                }
                None => {
                    debug!(lines = collected.len(), "output channel closed");
                    lines_open = false;
                }
            },
            err = errors.recv(), if errors_open => match err {
                Some(err) => {
                    debug!(err = %err, "inference run failed, stopping drain");
                    return Err(err.into());
                }
                None => {
                    debug!("error channel closed");
                    errors_open = false;
                }
            },
        }
    }

    Ok(collected)
}
