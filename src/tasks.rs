//! Background execution of long-running engine operations.
//!
//! Archive creation, comparison and restore are synchronous, I/O-bound units
//! of work. Callers that must stay responsive run them through these
//! `spawn_blocking` wrappers and await the handle; the engine itself defines
//! no internal parallelism.

use std::path::PathBuf;
use tokio::task::JoinHandle;

use crate::compare::{self, DiffResult};
use crate::restore::{self, RestoreReport};
use crate::snapshot::{archiver, Snapshot, SnapshotRef};
use crate::utils::errors::Result;

pub fn spawn_create_snapshot(
    source_dir: PathBuf,
    target_dir: PathBuf,
    note: Option<String>,
) -> JoinHandle<Result<Snapshot>> {
    tokio::task::spawn_blocking(move || {
        archiver::create_snapshot(&source_dir, &target_dir, note.as_deref())
    })
}

pub fn spawn_compare(older: SnapshotRef, newer: SnapshotRef) -> JoinHandle<Result<DiffResult>> {
    tokio::task::spawn_blocking(move || compare::compare_snapshots(&older, &newer))
}

pub fn spawn_restore(
    snapshot: SnapshotRef,
    target_dir: PathBuf,
) -> JoinHandle<Result<RestoreReport>> {
    tokio::task::spawn_blocking(move || restore::restore_snapshot(&snapshot, &target_dir))
}
