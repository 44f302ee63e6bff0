//! Error types shared by adapters, the coordinator and the report writer / 错误类型

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Query has no non-empty search term")]
    EmptyQuery,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("SQLite error in {path}: {source}")]
    Sqlite {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("Malformed row in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write report: {0}")]
    Report(String),

    #[error("Worker pool unavailable: {0}")]
    Pool(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SearchError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    pub fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse { path: path.to_path_buf(), message: message.into() }
    }

    pub fn sqlite(path: &Path, source: sqlx::Error) -> Self {
        Self::Sqlite { path: path.to_path_buf(), source }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv { path: path.to_path_buf(), source }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
