//! One invocation: load the file, ask the model, stream the answer, persist it.

use crate::config::Config;
use crate::input::{self, InputError};
use crate::logfile::{self, LogError};
use crate::multiplexer::{self, DrainError, LineSink};
use crate::prompt::Prompt;
use crate::runner::Launcher;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Everything a single run needs. Built once from the command line and config.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// File whose contents are sent to the model.
    pub file: PathBuf,
    /// The user's question; may be empty.
    pub question: String,
    /// Effective configuration, CLI overrides applied.
    pub config: Config,
}

/// Terminal failures of an invocation. All map to exit status 1.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Drain(#[from] DrainError),
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Run one invocation and return the streamed lines.
///
/// Nothing is launched when the input file cannot be read. The log is only
/// written after both channels closed without an error.
pub async fn run<L, S>(
    invocation: &Invocation,
    launcher: &L,
    sink: &mut S,
) -> Result<Vec<String>, AppError>
where
    L: Launcher + ?Sized,
    S: LineSink + ?Sized,
{
    let contents = input::read_file(&invocation.file).await?;
    let prompt = Prompt::compose(
        &invocation.question,
        &invocation.config.prompt.prefix,
        &contents,
    );

    let runner = &invocation.config.runner;
    info!(
        file = %invocation.file.display(),
        program = %runner.program,
        model = %runner.model,
        prompt_bytes = prompt.len(),
        "asking model"
    );

    let streams = launcher.launch(runner, &prompt);
    let lines = multiplexer::drain(streams, sink).await?;

    logfile::write_lines(&invocation.config.output.log_path, &lines).await?;
    Ok(lines)
}
