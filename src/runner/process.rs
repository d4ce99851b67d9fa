//! Launcher backed by a real OS process.
//!
//! The composed prompt is written to the child's stdin, never passed as an
//! argument. The command line is `<program> <args...> <model>`, which for the
//! defaults gives `ollama run llama3`.

use super::{InferenceStreams, Launcher, RunnerError};
use crate::config::RunnerConfig;
use crate::prompt::Prompt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Launches the inference program as a child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

fn command(runner: &RunnerConfig) -> Command {
    let mut command = Command::new(&runner.program);
    command
        .args(&runner.args)
        .arg(&runner.model)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    command
}

impl Launcher for ProcessLauncher {
    fn launch(&self, runner: &RunnerConfig, prompt: &Prompt) -> InferenceStreams {
        let (line_tx, error_tx, streams) = InferenceStreams::channel();
        let run = Run {
            program: runner.program.clone(),
            input: prompt.as_str().to_owned(),
            timeout: runner.timeout(),
        };
        tokio::spawn(run.supervise(command(runner), line_tx, error_tx));
        streams
    }
}

/// State moved into the supervisor task.
struct Run {
    program: String,
    input: String,
    timeout: Option<Duration>,
}

enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut(Duration),
}

impl Run {
    /// Spawn the child, start the writer and scanner, then wait for exit.
    ///
    /// The line channel closes when the scanner finishes. The error channel
    /// closes once this task and the scanner have both dropped their senders.
    async fn supervise(
        self,
        mut command: Command,
        line_tx: mpsc::Sender<String>,
        error_tx: mpsc::Sender<RunnerError>,
    ) {
        debug!(program = %self.program, "spawning inference process");
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                error!(program = %self.program, err = %source, "failed to start inference process");
                let _ = error_tx
                    .send(RunnerError::Start {
                        program: self.program,
                        source,
                    })
                    .await;
                return;
            }
        };
        debug!(pid = ?child.id(), "inference process started");

        let Some(stdin) = child.stdin.take() else {
            let _ = child.start_kill();
            let _ = error_tx
                .send(RunnerError::StdinPipe {
                    program: self.program,
                })
                .await;
            return;
        };
        tokio::spawn(write_prompt(stdin, self.input));

        let Some(stdout) = child.stdout.take() else {
            let _ = child.start_kill();
            let _ = error_tx
                .send(RunnerError::StdoutPipe {
                    program: self.program,
                })
                .await;
            return;
        };
        tokio::spawn(scan_lines(stdout, line_tx, error_tx.clone()));

        let failure = match wait(&mut child, self.timeout).await {
            Ok(WaitOutcome::Exited(status)) if status.success() => {
                debug!(%status, "inference process exited");
                None
            }
            Ok(WaitOutcome::Exited(status)) => {
                warn!(%status, "inference process failed");
                Some(RunnerError::Exit {
                    program: self.program,
                    status,
                })
            }
            Ok(WaitOutcome::TimedOut(after)) => {
                warn!(timeout_secs = after.as_secs(), "inference process timed out, killed");
                Some(RunnerError::TimedOut {
                    program: self.program,
                    after,
                })
            }
            Err(source) => Some(RunnerError::Wait {
                program: self.program,
                source,
            }),
        };

        if let Some(failure) = failure {
            let _ = error_tx.send(failure).await;
        }
    }
}

async fn wait(child: &mut Child, timeout: Option<Duration>) -> std::io::Result<WaitOutcome> {
    let Some(after) = timeout else {
        return child.wait().await.map(WaitOutcome::Exited);
    };

    let waited = tokio::time::timeout(after, child.wait()).await;
    match waited {
        Ok(status) => status.map(WaitOutcome::Exited),
        Err(_) => {
            child.kill().await?;
            Ok(WaitOutcome::TimedOut(after))
        }
    }
}

/// Write the whole prompt, then drop the handle to signal end of input.
async fn write_prompt(mut stdin: ChildStdin, input: String) {
    match stdin.write_all(input.as_bytes()).await {
        Ok(()) => debug!(bytes = input.len(), "prompt written"),
        // The exit status decides the outcome; an early exit shows up here
        // as a broken pipe.
        Err(e) => warn!(err = %e, "failed to write prompt to inference process"),
    }
}

/// Publish stdout line by line until it closes.
async fn scan_lines(
    stdout: ChildStdout,
    line_tx: mpsc::Sender<String>,
    error_tx: mpsc::Sender<RunnerError>,
) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut count = 0usize;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if line_tx.send(decode_line(&buf)).await.is_err() {
                    debug!("line receiver dropped, stopping scan");
                    break;
                }
                count += 1;
            }
            Err(e) => {
                error!(err = %e, "failed to read inference output");
                let _ = error_tx.send(RunnerError::Scan(e)).await;
                break;
            }
        }
    }

    debug!(lines = count, "output stream closed");
}

/// Strip the line terminator (`\n` or `\r\n`) and decode lossily.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
