//! Snapshot catalog: enumeration, manifest and note access, deletion.
//!
//! The target directory is append-only from the engine's perspective; the
//! only removal path is [`delete_snapshot`], which takes all three artifacts
//! down as one logical transaction under an exclusive per-snapshot guard.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::manifest::Manifest;
use super::{OpGuard, SnapshotRef, SnapshotStatus, ARCHIVE_SUFFIX};
use crate::utils::errors::{Result, SnapError};

/// Enumerate snapshots in `target_dir`, oldest first.
///
/// A snapshot whose manifest is missing or unparsable is included with
/// `SnapshotStatus::Corrupt` rather than silently omitted — callers decide
/// whether to surface or hide it.
pub fn list_snapshots(target_dir: &Path) -> Result<Vec<SnapshotRef>> {
    let entries = fs::read_dir(target_dir)
        .map_err(|e| SnapError::io("list snapshots", target_dir, e))?;

    let mut refs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SnapError::io("list snapshots", target_dir, e))?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(base) = file_name.strip_suffix(ARCHIVE_SUFFIX) else {
            continue;
        };
        // Unrelated zip files in the target directory are not snapshots
        let Some(mut snap) = SnapshotRef::in_dir(target_dir, base) else {
            continue;
        };

        if !snap.manifest_path.exists() {
            snap.status = SnapshotStatus::Corrupt("manifest missing".to_string());
        } else if let Err(e) = Manifest::load(&snap.manifest_path) {
            snap.status = SnapshotStatus::Corrupt(e.to_string());
        }
        if let SnapshotStatus::Corrupt(reason) = &snap.status {
            warn!(snapshot = %snap.name, %reason, "corrupt snapshot in catalog");
        }

        refs.push(snap);
    }

    refs.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(refs)
}

/// Resolve a snapshot by base name, requiring its archive to exist.
pub fn find_snapshot(target_dir: &Path, name: &str) -> Result<SnapshotRef> {
    let snap = SnapshotRef::in_dir(target_dir, name).ok_or_else(|| SnapError::Corrupt {
        name: name.to_string(),
        reason: "name does not follow the BACKUP_<timestamp> convention".to_string(),
    })?;
    if !snap.archive_path.exists() {
        return Err(SnapError::Corrupt {
            name: name.to_string(),
            reason: format!("archive missing: {}", snap.archive_path.display()),
        });
    }
    Ok(snap)
}

/// Load a snapshot's manifest. Missing or unparsable manifests surface as
/// `Corrupt` with the underlying cause.
pub fn load_manifest(snap: &SnapshotRef) -> Result<Manifest> {
    Manifest::load(&snap.manifest_path).map_err(|e| SnapError::Corrupt {
        name: snap.name.clone(),
        reason: e.to_string(),
    })
}

/// Load the free-text note, `None` when never set.
pub fn load_note(snap: &SnapshotRef) -> Result<Option<String>> {
    match fs::read_to_string(&snap.notes_path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SnapError::io("read note", &snap.notes_path, e)),
    }
}

/// Write or replace the note. Blank text removes the note artifact.
pub fn save_note(snap: &SnapshotRef, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        match fs::remove_file(&snap.notes_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnapError::io("remove note", &snap.notes_path, e)),
        }
    } else {
        fs::write(&snap.notes_path, text)
            .map_err(|e| SnapError::io("write note", &snap.notes_path, e))
    }
}

/// Delete a snapshot: archive, manifest and note together. Holds the
/// exclusive guard so no restore runs mid-deletion. Reports artifacts that
/// survived removal instead of leaving the caller guessing.
pub fn delete_snapshot(snap: &SnapshotRef) -> Result<()> {
    let _guard = OpGuard::acquire(snap)?;

    info!(snapshot = %snap.name, "deleting snapshot");

    let mut leftover: Vec<PathBuf> = Vec::new();
    for path in [&snap.archive_path, &snap.manifest_path, &snap.notes_path] {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to delete artifact");
                leftover.push(path.clone());
            }
        }
    }

    if leftover.is_empty() {
        Ok(())
    } else {
        Err(SnapError::DeleteIncomplete {
            name: snap.name.clone(),
            leftover,
        })
    }
}
