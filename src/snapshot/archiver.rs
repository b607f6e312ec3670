//! Snapshot creation.
//!
//! Walks the source tree in deterministic order and streams every file into
//! the zip archive while fingerprinting it in the same pass — each source
//! file is read exactly once, and never again at compare time. Artifacts are
//! written archive first, then manifest, then note; a failure part-way
//! triggers best-effort cleanup so the catalog never sees a half-written
//! snapshot as valid.

use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::fingerprint::{FingerprintBuilder, CHUNK_SIZE};
use super::manifest::{FileEntry, Manifest};
use super::{snapshot_name, Snapshot, SnapshotRef};
use crate::fs::walker::{walk_source, SourceFile};
use crate::utils::errors::{Result, SnapError};

/// Capture a full snapshot of `source_dir` into `target_dir`.
///
/// The snapshot is named after the capture timestamp at second resolution;
/// a second snapshot within the same second fails with `NameCollision`
/// rather than overwriting the first.
pub fn create_snapshot(
    source_dir: &Path,
    target_dir: &Path,
    note: Option<&str>,
) -> Result<Snapshot> {
    create_snapshot_at(source_dir, target_dir, note, Local::now())
}

/// Capture a snapshot with an explicit timestamp. Split out from
/// [`create_snapshot`] so collision behavior is testable.
pub fn create_snapshot_at(
    source_dir: &Path,
    target_dir: &Path,
    note: Option<&str>,
    created_at: DateTime<Local>,
) -> Result<Snapshot> {
    validate_source(source_dir)?;
    validate_target(target_dir)?;

    let name = snapshot_name(created_at);
    let paths = SnapshotRef::new(target_dir, &name, created_at.naive_local());

    if paths.archive_path.exists() || paths.manifest_path.exists() {
        return Err(SnapError::NameCollision { name });
    }

    info!(
        snapshot = %name,
        source = %source_dir.display(),
        "creating snapshot"
    );

    let note = note.map(str::trim).filter(|t| !t.is_empty());

    // Scan before any artifact exists; a scan failure leaves storage untouched
    let files =
        walk_source(source_dir).map_err(|e| SnapError::io("scan source", source_dir, e))?;

    match write_artifacts(source_dir, &files, note, &paths, created_at) {
        Ok(manifest) => {
            info!(
                snapshot = %name,
                files = manifest.total_files,
                bytes = manifest.total_bytes,
                "snapshot created"
            );
            Ok(Snapshot {
                paths,
                manifest,
                note: note.map(str::to_string),
            })
        }
        Err(e) => {
            let leftover = cleanup_partial(&paths);
            Err(SnapError::PartialWrite {
                name,
                context: e.to_string(),
                leftover,
            })
        }
    }
}

fn validate_source(source_dir: &Path) -> Result<()> {
    let invalid = |reason: &str| SnapError::InvalidDirectory {
        path: source_dir.to_path_buf(),
        reason: reason.to_string(),
    };

    let meta = fs::metadata(source_dir).map_err(|e| invalid(&e.to_string()))?;
    if !meta.is_dir() {
        return Err(invalid("not a directory"));
    }
    // Confirms readability up front, before any artifact is written
    fs::read_dir(source_dir).map_err(|e| invalid(&e.to_string()))?;
    Ok(())
}

fn validate_target(target_dir: &Path) -> Result<()> {
    let invalid = |reason: &str| SnapError::InvalidDirectory {
        path: target_dir.to_path_buf(),
        reason: reason.to_string(),
    };

    let meta = fs::metadata(target_dir).map_err(|e| invalid(&e.to_string()))?;
    if !meta.is_dir() {
        return Err(invalid("not a directory"));
    }
    if meta.permissions().readonly() {
        return Err(invalid("not writable"));
    }
    Ok(())
}

fn write_artifacts(
    source_dir: &Path,
    files: &[SourceFile],
    note: Option<&str>,
    paths: &SnapshotRef,
    created_at: DateTime<Local>,
) -> Result<Manifest> {
    let archive = File::create(&paths.archive_path)
        .map_err(|e| SnapError::io("create archive", &paths.archive_path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(archive));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = BTreeMap::new();
    let mut total_bytes = 0u64;
    let mut buf = vec![0u8; CHUNK_SIZE];

    for file in files {
        zip.start_file(file.relative_path.as_str(), options)
            .map_err(|e| SnapError::archive(&paths.archive_path, e))?;

        let mut reader =
            File::open(&file.path).map_err(|e| SnapError::io("read source file", &file.path, e))?;
        let mut builder = FingerprintBuilder::new();
        let mut written = 0u64;

        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| SnapError::io("read source file", &file.path, e))?;
            if n == 0 {
                break;
            }
            builder.update(&buf[..n]);
            zip.write_all(&buf[..n])
                .map_err(|e| SnapError::io("write archive", &paths.archive_path, e))?;
            written += n as u64;
        }

        total_bytes += written;
        entries.insert(
            file.relative_path.clone(),
            FileEntry {
                fingerprint: builder.finish(),
                size: written,
            },
        );
    }

    zip.finish()
        .map_err(|e| SnapError::archive(&paths.archive_path, e))?
        .flush()
        .map_err(|e| SnapError::io("flush archive", &paths.archive_path, e))?;

    let manifest = Manifest {
        backup_name: paths.name.clone(),
        created_at,
        source_directory: source_dir.to_path_buf(),
        total_files: entries.len(),
        total_bytes,
        files: entries,
    };
    manifest.save(&paths.manifest_path)?;

    if let Some(text) = note {
        fs::write(&paths.notes_path, text)
            .map_err(|e| SnapError::io("write note", &paths.notes_path, e))?;
    }

    Ok(manifest)
}

/// Remove whatever artifacts a failed creation left behind. Returns the paths
/// that could not be removed and therefore still exist.
fn cleanup_partial(paths: &SnapshotRef) -> Vec<PathBuf> {
    let mut leftover = Vec::new();
    for path in [&paths.archive_path, &paths.manifest_path, &paths.notes_path] {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to clean up partial artifact");
                leftover.push(path.clone());
            }
        }
    }
    leftover
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fingerprint::fingerprint_file;
    use crate::snapshot::{ARCHIVE_SUFFIX, MANIFEST_SUFFIX, NOTES_SUFFIX};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_ts() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 14, 9, 26, 53).unwrap()
    }

    fn populate_source(dir: &Path) {
        fs::create_dir_all(dir.join("nested")).expect("mkdir");
        fs::write(dir.join("a.txt"), b"hello").expect("write");
        fs::write(dir.join("nested/b.txt"), b"world").expect("write");
    }

    #[test]
    fn test_creates_all_artifacts() -> Result<()> {
        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");
        populate_source(source.path());

        let snap = create_snapshot_at(source.path(), target.path(), Some("first"), fixed_ts())?;

        assert!(snap.paths.archive_path.exists());
        assert!(snap.paths.manifest_path.exists());
        assert!(snap.paths.notes_path.exists());
        assert_eq!(snap.manifest.total_files, 2);
        assert_eq!(snap.manifest.total_bytes, 10);
        Ok(())
    }

    #[test]
    fn test_no_note_means_no_note_artifact() -> Result<()> {
        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");
        populate_source(source.path());

        let snap = create_snapshot_at(source.path(), target.path(), None, fixed_ts())?;
        assert!(!snap.paths.notes_path.exists());
        assert!(snap.note.is_none());

        Ok(())
    }

    #[test]
    fn test_blank_note_treated_as_absent() -> Result<()> {
        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");
        populate_source(source.path());

        let snap = create_snapshot_at(source.path(), target.path(), Some("   "), fixed_ts())?;
        assert!(!snap.paths.notes_path.exists());

        Ok(())
    }

    #[test]
    fn test_manifest_fingerprints_match_source() -> Result<()> {
        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");
        populate_source(source.path());

        let snap = create_snapshot_at(source.path(), target.path(), None, fixed_ts())?;

        for (rel, entry) in &snap.manifest.files {
            let recomputed = fingerprint_file(&source.path().join(rel)).expect("hash");
            assert_eq!(&recomputed, &entry.fingerprint, "mismatch for {rel}");
        }
        Ok(())
    }

    #[test]
    fn test_manifest_keys_are_sorted_relative_paths() -> Result<()> {
        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");
        populate_source(source.path());

        let snap = create_snapshot_at(source.path(), target.path(), None, fixed_ts())?;
        let keys: Vec<&String> = snap.manifest.files.keys().collect();
        assert_eq!(keys, vec!["a.txt", "nested/b.txt"]);

        Ok(())
    }

    #[test]
    fn test_same_second_collides() -> Result<()> {
        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");
        populate_source(source.path());

        let first = create_snapshot_at(source.path(), target.path(), None, fixed_ts())?;
        let second = create_snapshot_at(source.path(), target.path(), None, fixed_ts());

        assert!(matches!(second, Err(SnapError::NameCollision { .. })));
        // First snapshot's artifacts untouched
        assert!(first.paths.archive_path.exists());
        assert!(first.paths.manifest_path.exists());
        Ok(())
    }

    #[test]
    fn test_missing_source_fails_fast() {
        let target = TempDir::new().expect("target");
        let result = create_snapshot_at(
            Path::new("/definitely/not/here"),
            target.path(),
            None,
            fixed_ts(),
        );
        assert!(matches!(result, Err(SnapError::InvalidDirectory { .. })));
        // Nothing written
        assert_eq!(fs::read_dir(target.path()).expect("read").count(), 0);
    }

    #[test]
    fn test_missing_target_fails_fast() {
        let source = TempDir::new().expect("source");
        populate_source(source.path());

        let result = create_snapshot_at(
            source.path(),
            Path::new("/definitely/not/here"),
            None,
            fixed_ts(),
        );
        assert!(matches!(result, Err(SnapError::InvalidDirectory { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_readonly_target_fails_fast() {
        use std::os::unix::fs::PermissionsExt;

        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");
        populate_source(source.path());

        fs::set_permissions(target.path(), fs::Permissions::from_mode(0o555)).expect("chmod");
        let result = create_snapshot_at(source.path(), target.path(), None, fixed_ts());
        fs::set_permissions(target.path(), fs::Permissions::from_mode(0o755)).expect("chmod back");

        assert!(matches!(result, Err(SnapError::InvalidDirectory { .. })));
        // Nothing written
        assert_eq!(fs::read_dir(target.path()).expect("read").count(), 0);
    }

    #[test]
    fn test_failed_note_write_cleans_up_earlier_artifacts() {
        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");
        populate_source(source.path());

        // Occupy the notes path with a directory: archive and manifest write
        // fine, the note write fails, and cleanup has to take them back out.
        let name = snapshot_name(fixed_ts());
        fs::create_dir(target.path().join(format!("{name}{NOTES_SUFFIX}"))).expect("mkdir");

        let result = create_snapshot_at(source.path(), target.path(), Some("doomed"), fixed_ts());

        match result {
            Err(SnapError::PartialWrite { leftover, .. }) => {
                // Only the blocking directory itself resists removal
                assert_eq!(leftover.len(), 1);
                assert!(leftover[0].ends_with(format!("{name}{NOTES_SUFFIX}")));
            }
            other => panic!("expected PartialWrite, got {other:?}"),
        }
        assert!(!target.path().join(format!("{name}{ARCHIVE_SUFFIX}")).exists());
        assert!(!target.path().join(format!("{name}{MANIFEST_SUFFIX}")).exists());
    }

    #[test]
    fn test_empty_source_yields_empty_manifest() -> Result<()> {
        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");

        let snap = create_snapshot_at(source.path(), target.path(), None, fixed_ts())?;
        assert_eq!(snap.manifest.total_files, 0);
        assert!(snap.paths.archive_path.exists());

        Ok(())
    }
}
