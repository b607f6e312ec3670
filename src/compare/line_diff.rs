//! Line-level diffs for modified text entries.
//!
//! Fingerprint comparison tells us *that* a file changed; for recognized
//! text files the comparator additionally shows *how*, via an LCS line
//! alignment over the archived bytes. Single entries are pulled straight out
//! of the archive so a line diff never costs a full extraction.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::utils::errors::{Result, SnapError};

/// Extensions treated as line-oriented text. Everything else keeps a bare
/// modified marker with no line diff.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "log", "ini", "cfg", "conf", "json", "xml", "yml", "yaml", "toml", "sql", "sh",
    "bat", "ps1", "py", "js", "ts", "jsx", "tsx", "html", "css", "c", "h", "cpp", "hpp", "cs",
    "java", "go", "rs", "rb", "php", "swift", "kt",
];

pub fn is_text_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| TEXT_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Equal,
    Insert,
    Delete,
}

/// One aligned line of a diff, in output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineChange {
    pub kind: ChangeKind,

    /// 1-based line number in the older file; absent for inserted lines.
    pub old_line: Option<usize>,

    /// 1-based line number in the newer file; absent for deleted lines.
    pub new_line: Option<usize>,

    /// Line content without the trailing newline.
    pub text: String,
}

/// LCS-aligned line diff. Output is identical across runs for a given pair.
pub fn diff_lines(old: &str, new: &str) -> Vec<LineChange> {
    let text_diff = TextDiff::from_lines(old, new);

    let mut changes = Vec::new();
    for change in text_diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => ChangeKind::Equal,
            ChangeTag::Insert => ChangeKind::Insert,
            ChangeTag::Delete => ChangeKind::Delete,
        };
        changes.push(LineChange {
            kind,
            old_line: change.old_index().map(|i| i + 1),
            new_line: change.new_index().map(|i| i + 1),
            text: change
                .value()
                .trim_end_matches('\n')
                .trim_end_matches('\r')
                .to_string(),
        });
    }
    changes
}

/// Read one entry's bytes out of a snapshot archive without unpacking the
/// rest of it.
pub fn read_archive_entry(archive_path: &Path, entry: &str) -> Result<Vec<u8>> {
    let file =
        File::open(archive_path).map_err(|e| SnapError::io("open archive", archive_path, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| SnapError::archive(archive_path, e))?;
    let mut reader = archive
        .by_name(entry)
        .map_err(|e| SnapError::archive(archive_path, e))?;

    let mut bytes = Vec::with_capacity(reader.size() as usize);
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| SnapError::io("read archive entry", archive_path, e))?;
    Ok(bytes)
}
