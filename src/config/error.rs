use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by a [`Format`](super::Format) parser.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("wrong usage: {0}")]
    Usage(String),

    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {format} document: {source}")]
    Parse { format: String, source: BoxError },

    #[error("item not found: {path}")]
    ItemNotFound { path: String },

    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("failed to deserialize config value: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn parse(format: &str, source: impl Into<BoxError>) -> Self {
        Self::Parse {
            format: format.to_string(),
            source: source.into(),
        }
    }
}
