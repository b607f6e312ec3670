//! Snapshot restoration.
//!
//! Overlay semantics: every archive entry is extracted into the target
//! directory, overwriting conflicts and creating missing parents; files
//! already in the target but absent from the snapshot are left untouched.
//! The first entry that fails to extract stops the run, and the report
//! splits entries into restored / failed / not attempted so the caller can
//! say exactly how much landed.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{info, warn};
use zip::ZipArchive;

use crate::snapshot::{OpGuard, SnapshotRef};
use crate::utils::errors::{Result, SnapError};

#[derive(Debug, Clone)]
pub struct RestoreFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of a restore. Partial failure is a result, not an error: the
/// caller always learns which entries made it.
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    pub failed: Vec<RestoreFailure>,
    pub not_attempted: Vec<String>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.not_attempted.is_empty()
    }
}

/// Extract a snapshot's archive onto `target_dir` (created if missing).
///
/// Holds the exclusive per-snapshot guard shared with deletion, so a
/// snapshot cannot be deleted out from under a running restore.
pub fn restore_snapshot(snap: &SnapshotRef, target_dir: &Path) -> Result<RestoreReport> {
    let _guard = OpGuard::acquire(snap)?;

    fs::create_dir_all(target_dir)
        .map_err(|e| SnapError::io("create restore target", target_dir, e))?;

    let file = File::open(&snap.archive_path)
        .map_err(|e| SnapError::io("open archive", &snap.archive_path, e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| SnapError::archive(&snap.archive_path, e))?;

    info!(
        snapshot = %snap.name,
        target = %target_dir.display(),
        entries = archive.len(),
        "restoring snapshot"
    );

    let total = archive.len();
    let mut report = RestoreReport::default();
    let mut stopped_at = None;

    for index in 0..total {
        match extract_entry(&mut archive, index, target_dir) {
            Ok(Some(name)) => report.restored.push(name),
            Ok(None) => {} // directory entry, nothing to report
            Err((name, reason)) => {
                warn!(entry = %name, %reason, "restore stopped at failing entry");
                report.failed.push(RestoreFailure { path: name, reason });
                stopped_at = Some(index + 1);
                break;
            }
        }
    }

    if let Some(next) = stopped_at {
        for index in next..total {
            match archive.by_index(index) {
                Ok(entry) => {
                    if !entry.is_dir() {
                        report.not_attempted.push(entry.name().to_string());
                    }
                }
                // Unreadable header still counts as a skipped entry
                Err(_) => report.not_attempted.push(format!("entry #{index}")),
            }
        }
    }

    Ok(report)
}

/// Extract one entry; `Ok(None)` for directory entries. Errors carry the
/// entry name so the report can point at the exact file.
fn extract_entry(
    archive: &mut ZipArchive<File>,
    index: usize,
    target_dir: &Path,
) -> std::result::Result<Option<String>, (String, String)> {
    let mut entry = archive
        .by_index(index)
        .map_err(|e| (format!("entry #{index}"), e.to_string()))?;
    let entry_name = entry.name().to_string();

    // Reject entry names that would escape the target directory
    let Some(rel) = entry.enclosed_name() else {
        return Err((entry_name, "entry path escapes target directory".to_string()));
    };
    let dest = target_dir.join(rel);

    if entry.is_dir() {
        fs::create_dir_all(&dest).map_err(|e| (entry_name, e.to_string()))?;
        return Ok(None);
    }

    let written = (|| -> io::Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest)?;
        io::copy(&mut entry, &mut out)?;
        Ok(())
    })();

    match written {
        Ok(()) => Ok(Some(entry_name)),
        Err(e) => Err((entry_name, e.to_string())),
    }
}
