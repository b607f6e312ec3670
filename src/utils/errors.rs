//! Custom error types for the snapshot engine.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapError {
    #[error("invalid directory {path}: {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    #[error("snapshot {name} already exists")]
    NameCollision { name: String },

    #[error("snapshot {name} was not fully written: {context}; leftover artifacts: {leftover:?}")]
    PartialWrite {
        name: String,
        context: String,
        /// Artifacts that best-effort cleanup could not remove.
        leftover: Vec<PathBuf>,
    },

    #[error("snapshot {name} is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("snapshot {name} is busy with another destructive operation")]
    SnapshotBusy { name: String },

    #[error("snapshot {name} was not fully deleted; remaining artifacts: {leftover:?}")]
    DeleteIncomplete { name: String, leftover: Vec<PathBuf> },

    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl SnapError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        SnapError::Archive {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapError>;
