//! Persisting the model's response.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("could not write {}: {source}", .path.display())]
pub struct LogError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Write `lines` joined by `\n` to `path`, replacing any previous content.
pub async fn write_lines(path: &Path, lines: &[String]) -> Result<(), LogError> {
    write_log(path, &lines.join("\n")).await
}

/// Write `content` to `path`, replacing any previous content.
pub async fn write_log(path: &Path, content: &str) -> Result<(), LogError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|source| LogError {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), bytes = content.len(), "response written");
    Ok(())
}
