//! Snapshot manifests.
//!
//! A manifest records every file in a snapshot with its content fingerprint
//! and size, allowing two snapshots to be diffed without re-reading any file
//! bytes. Written once at capture time, never mutated — serialized as
//! `<base>_hashes.json` next to the archive.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::errors::{Result, SnapError};

/// Metadata for a single file in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Hex-encoded content digest.
    pub fingerprint: String,

    /// Uncompressed size in bytes.
    pub size: u64,
}

/// Full description of one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub backup_name: String,
    pub created_at: DateTime<Local>,
    pub source_directory: PathBuf,

    /// Relative path (POSIX separators, unique) -> entry. A `BTreeMap` keeps
    /// serialization order lexicographic and therefore reproducible.
    pub files: BTreeMap<String, FileEntry>,

    pub total_files: usize,
    pub total_bytes: u64,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).map_err(|e| SnapError::io("read manifest", path, e))?;
        serde_json::from_slice(&raw).map_err(|e| SnapError::Manifest {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_vec_pretty(self).map_err(|e| SnapError::Manifest {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, raw).map_err(|e| SnapError::io("write manifest", path, e))
    }
}
