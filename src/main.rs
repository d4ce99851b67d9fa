//! codellm - ask a local LLM about a source file.
//!
//! Sends a file plus a question to a locally running model process (by
//! default `ollama run llama3`), streams the answer to the terminal line by
//! line, and saves the full answer to a log file.

mod app;
mod config;
mod input;
mod logfile;
mod multiplexer;
mod prompt;
mod runner;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use app::{AppError, Invocation};
use clap::error::ErrorKind;
use clap::Parser;
use config::{Config, Overrides};
use multiplexer::{ConsoleSink, LineSink};
use runner::{Launcher, ProcessLauncher};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "codellm")]
#[command(author, version, about = "Ask a local LLM about a source file")]
#[command(long_about = "Sends FILE and PROMPT to a local model process, streams the answer to stdout\nand writes it to a log file.\n\nDefaults can be changed in ~/.config/codellm/config.toml.")]
struct Cli {
    /// File whose contents are sent to the model
    #[arg(value_name = "FILE", required_unless_present = "print_config")]
    file: Option<PathBuf>,

    /// Question to ask about the file
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,

    /// Override the model name
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Override the inference program
    #[arg(long, value_name = "PROGRAM")]
    program: Option<String>,

    /// Override the log file path
    #[arg(short = 'o', long = "log", value_name = "PATH")]
    log: Option<PathBuf>,

    /// Kill the model process after this many seconds (0 disables)
    #[arg(short = 't', long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable debug logging on stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            model: self.model.clone(),
            program: self.program.clone(),
            log_path: self.log.clone(),
            timeout_secs: self.timeout,
        }
    }

    fn into_invocation(self, config: Config) -> Result<Invocation, AppError> {
        let file = self
            .file
            .ok_or_else(|| AppError::Usage("please provide a file".to_string()))?;
        Ok(Invocation {
            file,
            question: self.prompt.unwrap_or_default(),
            config,
        })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A child still running after a fatal error is killed when the runtime
    // drops its task.
    let mut console = ConsoleSink::new();
    let status = run_cli(std::env::args_os(), Config::load, &ProcessLauncher, &mut console).await?;
    Ok(ExitCode::from(status))
}

/// Parse `args`, load the config and run one invocation. Returns the exit status.
async fn run_cli<I, T, F, L, S>(args: I, load_config: F, launcher: &L, sink: &mut S) -> Result<u8>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    F: FnOnce() -> Result<Config>,
    L: Launcher + ?Sized,
    S: LineSink + ?Sized,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Ok(usage_status(&e).unwrap_or(0));
        }
    };

    init_tracing(cli.verbose);

    let config = cli
        .overrides()
        .apply(load_config().context("Failed to load configuration")?);

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(0);
    }

    // Status goes to stderr so stdout carries only the model's answer.
    if atty::is(atty::Stream::Stderr) {
        eprintln!("Please wait, the model is thinking...");
    }

    match execute(cli, config, launcher, sink).await {
        Ok(_) => Ok(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(1)
        }
    }
}

/// Turn the parsed command line into an invocation and run it.
async fn execute<L, S>(
    cli: Cli,
    config: Config,
    launcher: &L,
    sink: &mut S,
) -> Result<Vec<String>, AppError>
where
    L: Launcher + ?Sized,
    S: LineSink + ?Sized,
{
    let invocation = cli.into_invocation(config)?;
    app::run(&invocation, launcher, sink).await
}

/// Exit status for an argument error: 1 for usage errors, `None` for help and
/// version output.
fn usage_status(e: &clap::Error) -> Option<u8> {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
        _ => Some(1),
    }
}

fn init_tracing(verbose: bool) {
    let directive = if verbose { "codellm=debug" } else { "codellm=warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse().unwrap()))
        .try_init();
}
