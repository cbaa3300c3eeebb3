use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("invalid paper id: {0}")]
    InvalidPaperId(String),

    #[error("invalid arXiv id: {0}")]
    InvalidArxivId(String),

    #[error("no paper found for title: {0}")]
    PaperNotFound(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read titles file at {0}")]
    TitlesRead(PathBuf),

    #[error("Semantic Scholar request failed: {0}")]
    ScholarHttp(String),

    #[error("Semantic Scholar returned status {status}: {message}")]
    ScholarStatus { status: u16, message: String },

    #[error("arXiv request failed: {0}")]
    ArxivHttp(String),

    #[error("arXiv returned status {status} for {arxiv_id}")]
    ArxivStatus { status: u16, arxiv_id: String },

    #[error("failed to parse snapshot {path}: {message}")]
    SnapshotParse { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl HarvestError {
    /// Whether the failure came from talking to a remote service rather than local state.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            HarvestError::ScholarHttp(_)
                | HarvestError::ScholarStatus { .. }
                | HarvestError::ArxivHttp(_)
                | HarvestError::ArxivStatus { .. }
        )
    }
}
