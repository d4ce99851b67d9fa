//! Loading the file the user is asking about.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading the input file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("could not read file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read the whole file as text. Invalid UTF-8 is replaced rather than rejected.
pub async fn read_file(path: &Path) -> Result<String, InputError> {
    match tokio::fs::try_exists(path).await {
        Ok(true) => {}
        Ok(false) => return Err(InputError::NotFound(path.to_path_buf())),
        Err(source) => {
            return Err(InputError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let bytes = tokio::fs::read(path).await.map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
