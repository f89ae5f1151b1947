use std::{fmt, io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("error while loading {path:?}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error while parsing {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid coverage manifest {path:?}: {details}")]
    Manifest { path: PathBuf, details: String },
    #[error("failed to write report {path:?}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MergeError>;

impl MergeError {
    pub fn config(details: impl fmt::Display) -> Self {
        Self::Config(details.to_string())
    }

    pub fn load(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, details: impl fmt::Display) -> Self {
        Self::Manifest {
            path: path.into(),
            details: details.to_string(),
        }
    }

    pub fn report(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Report {
            path: path.into(),
            source,
        }
    }
}
