//! Snapvault Library
//!
//! Point-in-time directory snapshot manager: captures a directory tree into
//! an immutable zip archive plus a manifest of per-file content
//! fingerprints, classifies differences between any two snapshots without
//! re-reading file contents, and restores snapshots with overlay semantics.

pub mod compare;
pub mod config;
pub mod fs;
pub mod restore;
pub mod snapshot;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use utils::errors::SnapError;
pub type Result<T> = std::result::Result<T, SnapError>;
