//! Persisted configuration: the two remembered directories.
//!
//! Loaded once at startup and threaded explicitly into the operations that
//! need it; the engine never reads this file itself.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "snapvault_config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory snapshots are captured from.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Directory snapshots are stored in.
    #[serde(default)]
    pub target_dir: Option<PathBuf>,
}

impl Config {
    /// Load from `path`. A missing file is an empty configuration, not an
    /// error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
