//! Deterministic source-tree traversal.
//!
//! Manifests key files by relative path, so enumeration must be reproducible:
//! regular files only, sorted lexicographically by their POSIX-style relative
//! path. Iteration order of the underlying filesystem never leaks into a
//! manifest.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A regular file discovered under the source root.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path on disk.
    pub path: PathBuf,

    /// Relative path from the root, `/`-separated. This is the manifest key
    /// and the archive entry name.
    pub relative_path: String,

    /// Size in bytes at scan time.
    pub size: u64,
}

/// Walk `root` and collect every regular file, sorted by relative path.
///
/// Symlinks that resolve to regular files are included with the target's
/// size; symlinks to directories and broken symlinks are skipped.
pub fn walk_source(root: &Path) -> std::io::Result<Vec<SourceFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path().to_path_buf();
        let size = if entry.path_is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_file() => resolved.len(),
                // Symlink to a directory, or broken — skip it
                _ => continue,
            }
        } else {
            entry.metadata().map_err(std::io::Error::from)?.len()
        };

        let rel = path.strip_prefix(root).unwrap_or(&path);
        files.push(SourceFile {
            relative_path: posix_relative(rel),
            path,
            size,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

fn posix_relative(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
