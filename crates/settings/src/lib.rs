//! Persisted preferences and the per-session working folder.

mod prefs;
mod session;

pub use prefs::{default_path, Preferences};
pub use session::{Session, ORIGINAL_FILE, REVERSED_FILE, TEMP_PREFIX};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("No configuration directory available")]
    NoConfigDir,

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create working folder: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}
