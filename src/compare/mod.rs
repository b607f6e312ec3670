//! Snapshot comparison.
//!
//! [`compare`] classifies every path across two manifests by fingerprint
//! alone — cost proportional to manifest size, independent of file bytes.
//! [`compare_snapshots`] layers optional line diffs on top for modified text
//! entries, the only place file content is read again.

pub mod line_diff;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub use line_diff::{ChangeKind, LineChange};

use crate::snapshot::catalog;
use crate::snapshot::manifest::{FileEntry, Manifest};
use crate::snapshot::SnapshotRef;
use crate::utils::errors::Result;
use line_diff::{diff_lines, is_text_path, read_archive_entry};

/// A path present in both manifests with differing fingerprints.
#[derive(Debug, Clone, Serialize)]
pub struct ModifiedEntry {
    pub before: FileEntry,
    pub after: FileEntry,

    /// Line-level changes when both sides are recognized text; `None` marks
    /// an opaque (binary) change.
    pub line_diff: Option<Vec<LineChange>>,
}

/// Classification of every path across two manifests. The four maps
/// partition the union of both path sets; no path appears in more than one.
#[derive(Debug, Default, Serialize)]
pub struct DiffResult {
    pub added: BTreeMap<String, FileEntry>,
    pub removed: BTreeMap<String, FileEntry>,
    pub modified: BTreeMap<String, ModifiedEntry>,
    pub unchanged: BTreeMap<String, FileEntry>,
}

impl DiffResult {
    pub fn total_paths(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len() + self.unchanged.len()
    }

    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} added, {} removed, {} modified, {} unchanged",
            self.added.len(),
            self.removed.len(),
            self.modified.len(),
            self.unchanged.len()
        )
    }
}

/// Classify every path across two manifests by fingerprint. Pure: no file
/// content is read here, ever.
pub fn compare(older: &Manifest, newer: &Manifest) -> DiffResult {
    let mut diff = DiffResult::default();

    for (path, entry) in &newer.files {
        match older.files.get(path) {
            None => {
                diff.added.insert(path.clone(), entry.clone());
            }
            Some(prev) if prev.fingerprint == entry.fingerprint => {
                diff.unchanged.insert(path.clone(), entry.clone());
            }
            Some(prev) => {
                diff.modified.insert(
                    path.clone(),
                    ModifiedEntry {
                        before: prev.clone(),
                        after: entry.clone(),
                        line_diff: None,
                    },
                );
            }
        }
    }

    for (path, entry) in &older.files {
        if !newer.files.contains_key(path) {
            diff.removed.insert(path.clone(), entry.clone());
        }
    }

    diff
}

/// Compare two snapshots and attach line diffs for modified text entries.
///
/// Only the modified-and-text entries cost file reads, each extracted as a
/// single archive entry; classification itself stays fingerprint-only.
pub fn compare_snapshots(older: &SnapshotRef, newer: &SnapshotRef) -> Result<DiffResult> {
    let manifest_a = catalog::load_manifest(older)?;
    let manifest_b = catalog::load_manifest(newer)?;

    let mut diff = compare(&manifest_a, &manifest_b);
    debug!(older = %older.name, newer = %newer.name, summary = %diff.summary(), "compared manifests");

    for (path, entry) in diff.modified.iter_mut() {
        if !is_text_path(path) {
            continue;
        }
        let before = read_archive_entry(&older.archive_path, path)?;
        let after = read_archive_entry(&newer.archive_path, path)?;
        entry.line_diff = Some(diff_lines(
            &String::from_utf8_lossy(&before),
            &String::from_utf8_lossy(&after),
        ));
    }

    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    // Entries exist only in memory — none of these paths are on disk, so
    // these tests also prove classification never reads file bytes.
    fn manifest_of(entries: &[(&str, &str)]) -> Manifest {
        let files: BTreeMap<String, FileEntry> = entries
            .iter()
            .map(|(path, fp)| {
                (
                    path.to_string(),
                    FileEntry {
                        fingerprint: fp.to_string(),
                        size: fp.len() as u64,
                    },
                )
            })
            .collect();
        Manifest {
            backup_name: "BACKUP_01_01_2024_00_00_00".to_string(),
            created_at: Local::now(),
            source_directory: PathBuf::from("/src"),
            total_files: files.len(),
            total_bytes: files.values().map(|e| e.size).sum(),
            files,
        }
    }

    #[test]
    fn test_classification_scenario() {
        // a.txt modified, b.txt removed, c.txt added
        let older = manifest_of(&[("a.txt", "hash-hello"), ("b.txt", "hash-world")]);
        let newer = manifest_of(&[("a.txt", "hash-HELLO"), ("c.txt", "hash-new")]);

        let diff = compare(&older, &newer);

        assert_eq!(diff.added.keys().collect::<Vec<_>>(), vec!["c.txt"]);
        assert_eq!(diff.removed.keys().collect::<Vec<_>>(), vec!["b.txt"]);
        assert_eq!(diff.modified.keys().collect::<Vec<_>>(), vec!["a.txt"]);
        assert!(diff.unchanged.is_empty());
    }

    #[test]
    fn test_compare_with_self_is_all_unchanged() {
        let manifest = manifest_of(&[("a.txt", "x"), ("b/c.txt", "y"), ("d.bin", "z")]);
        let diff = compare(&manifest, &manifest);

        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert!(diff.modified.is_empty());
        assert_eq!(diff.unchanged.len(), manifest.files.len());
        assert!(!diff.has_changes());
    }

    #[test]
    fn test_partition_law() {
        let older = manifest_of(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let newer = manifest_of(&[("b", "2"), ("c", "3x"), ("d", "4")]);

        let diff = compare(&older, &newer);

        let mut seen = BTreeSet::new();
        for key in diff
            .added
            .keys()
            .chain(diff.removed.keys())
            .chain(diff.modified.keys())
            .chain(diff.unchanged.keys())
        {
            assert!(seen.insert(key.clone()), "{key} appears in two sets");
        }

        let union: BTreeSet<String> = older
            .files
            .keys()
            .chain(newer.files.keys())
            .cloned()
            .collect();
        assert_eq!(seen, union);
        assert_eq!(diff.total_paths(), union.len());
    }

    #[test]
    fn test_modified_entry_carries_both_sides() {
        let older = manifest_of(&[("f.txt", "old")]);
        let newer = manifest_of(&[("f.txt", "new")]);

        let diff = compare(&older, &newer);
        let entry = diff.modified.get("f.txt").expect("modified");
        assert_eq!(entry.before.fingerprint, "old");
        assert_eq!(entry.after.fingerprint, "new");
        assert!(entry.line_diff.is_none());
    }

    #[test]
    fn test_compare_snapshots_attaches_line_diffs() -> Result<()> {
        use crate::snapshot::archiver::create_snapshot_at;
        use chrono::TimeZone;
        use std::fs;
        use tempfile::TempDir;

        let source = TempDir::new().expect("source");
        let target = TempDir::new().expect("target");

        // First state: a.txt = "hello", b.txt = "world", blob.bin
        fs::write(source.path().join("a.txt"), b"hello\n").expect("write");
        fs::write(source.path().join("b.txt"), b"world\n").expect("write");
        fs::write(source.path().join("blob.bin"), [0u8, 1, 2]).expect("write");
        let ts1 = Local.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap();
        let first = create_snapshot_at(source.path(), target.path(), None, ts1)?;

        // Second state: a.txt modified, b.txt deleted, c.txt added,
        // blob.bin modified (binary)
        fs::write(source.path().join("a.txt"), b"HELLO\n").expect("write");
        fs::remove_file(source.path().join("b.txt")).expect("remove");
        fs::write(source.path().join("c.txt"), b"new\n").expect("write");
        fs::write(source.path().join("blob.bin"), [9u8, 9, 9]).expect("write");
        let ts2 = Local.with_ymd_and_hms(2024, 3, 14, 9, 0, 1).unwrap();
        let second = create_snapshot_at(source.path(), target.path(), None, ts2)?;

        let diff = compare_snapshots(&first.paths, &second.paths)?;

        assert_eq!(diff.added.keys().collect::<Vec<_>>(), vec!["c.txt"]);
        assert_eq!(diff.removed.keys().collect::<Vec<_>>(), vec!["b.txt"]);
        assert_eq!(
            diff.modified.keys().collect::<Vec<_>>(),
            vec!["a.txt", "blob.bin"]
        );
        assert!(diff.unchanged.is_empty());

        // Text file gets a line diff pulled from the archived bytes
        let text_changes = diff.modified["a.txt"]
            .line_diff
            .as_ref()
            .expect("line diff for text file");
        assert!(text_changes
            .iter()
            .any(|c| c.kind == ChangeKind::Delete && c.text == "hello"));
        assert!(text_changes
            .iter()
            .any(|c| c.kind == ChangeKind::Insert && c.text == "HELLO"));

        // Binary file carries only the opaque change marker
        assert!(diff.modified["blob.bin"].line_diff.is_none());

        Ok(())
    }

    #[test]
    fn test_summary_counts() {
        let older = manifest_of(&[("a", "1"), ("b", "2")]);
        let newer = manifest_of(&[("a", "1"), ("c", "3")]);
        let diff = compare(&older, &newer);
        assert_eq!(diff.summary(), "1 added, 1 removed, 0 modified, 1 unchanged");
    }
}
