//! Utility modules for the snapshot manager.

pub mod errors;
pub mod format;
pub mod logger;

pub use errors::{Result, SnapError};
