//! Snapshot identity and on-disk layout.
//!
//! A snapshot is three co-located artifacts sharing one timestamp-derived
//! base name: the archive (`<base>.zip`), the manifest (`<base>_hashes.json`)
//! and an optional note (`<base>_notes.txt`). The naming convention lives
//! here; callers never concatenate suffixes themselves.

pub mod archiver;
pub mod catalog;
pub mod fingerprint;
pub mod manifest;

use chrono::{DateTime, Local, NaiveDateTime};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::utils::errors::{Result, SnapError};
use manifest::Manifest;

pub const SNAPSHOT_PREFIX: &str = "BACKUP_";
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";
pub const ARCHIVE_SUFFIX: &str = ".zip";
pub const MANIFEST_SUFFIX: &str = "_hashes.json";
pub const NOTES_SUFFIX: &str = "_notes.txt";

/// Base name for a snapshot captured at `created_at` (second resolution).
pub fn snapshot_name(created_at: DateTime<Local>) -> String {
    format!("{SNAPSHOT_PREFIX}{}", created_at.format(TIMESTAMP_FORMAT))
}

/// Recover the capture timestamp from a snapshot base name.
pub fn parse_snapshot_name(name: &str) -> Option<NaiveDateTime> {
    let stamp = name.strip_prefix(SNAPSHOT_PREFIX)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStatus {
    /// All required artifacts present and the manifest parses.
    Intact,
    /// Required artifact missing or manifest unparsable; reported, not hidden.
    Corrupt(String),
}

/// Handle to one snapshot's artifacts in a target directory.
#[derive(Debug, Clone)]
pub struct SnapshotRef {
    pub name: String,
    pub created_at: NaiveDateTime,
    pub archive_path: PathBuf,
    pub manifest_path: PathBuf,
    pub notes_path: PathBuf,
    pub status: SnapshotStatus,
}

impl SnapshotRef {
    pub(crate) fn new(dir: &Path, name: &str, created_at: NaiveDateTime) -> Self {
        Self {
            name: name.to_string(),
            created_at,
            archive_path: dir.join(format!("{name}{ARCHIVE_SUFFIX}")),
            manifest_path: dir.join(format!("{name}{MANIFEST_SUFFIX}")),
            notes_path: dir.join(format!("{name}{NOTES_SUFFIX}")),
            status: SnapshotStatus::Intact,
        }
    }

    /// Build a ref for `name` under `dir`. Returns `None` when the name does
    /// not follow the `BACKUP_<timestamp>` convention.
    pub fn in_dir(dir: &Path, name: &str) -> Option<Self> {
        let created_at = parse_snapshot_name(name)?;
        Some(Self::new(dir, name, created_at))
    }

    pub fn is_intact(&self) -> bool {
        self.status == SnapshotStatus::Intact
    }
}

/// A freshly created snapshot, as returned by the archiver.
#[derive(Debug)]
pub struct Snapshot {
    pub paths: SnapshotRef,
    pub manifest: Manifest,
    pub note: Option<String>,
}

fn active_ops() -> &'static Mutex<HashSet<String>> {
    static OPS: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    OPS.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive per-snapshot guard held for the duration of a destructive
/// operation (delete, restore). Keyed by archive path so equally-named
/// snapshots in different target directories stay independent. A second
/// acquisition for the same snapshot fails with `SnapshotBusy` instead of
/// blocking.
pub(crate) struct OpGuard {
    key: String,
}

impl OpGuard {
    pub(crate) fn acquire(snap: &SnapshotRef) -> Result<Self> {
        let key = snap.archive_path.to_string_lossy().into_owned();
        let mut ops = active_ops().lock().unwrap_or_else(|e| e.into_inner());
        if !ops.insert(key.clone()) {
            return Err(SnapError::SnapshotBusy {
                name: snap.name.clone(),
            });
        }
        Ok(Self { key })
    }
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        let mut ops = active_ops().lock().unwrap_or_else(|e| e.into_inner());
        ops.remove(&self.key);
    }
}
