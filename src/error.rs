use std::path::PathBuf;
use thiserror::Error;

/// Failure classes surfaced by the export pipeline.
///
/// Only `Config` aborts a run. `Fetch`, `Parse`, and `Filesystem` are
/// recovered per page or per asset and rolled up into the summary counts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("request for {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("could not parse response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("filesystem error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        ExportError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
