use std::path::{Path, PathBuf};

use rp_common::{clamp_output_fps, DEFAULT_OUTPUT_FPS};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Session, SettingsError};

/// User preferences carried between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Working folder picked by the user. `None` uses a fresh temp folder.
    pub temp_folder: Option<PathBuf>,
    pub keep_reversed_video: bool,
    pub output_fps: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            temp_folder: None,
            keep_reversed_video: false,
            output_fps: DEFAULT_OUTPUT_FPS,
        }
    }
}

/// `<config_dir>/reverse-player/settings.json`
pub fn default_path() -> Result<PathBuf, SettingsError> {
    dirs::config_dir()
        .map(|dir| dir.join("reverse-player").join("settings.json"))
        .ok_or(SettingsError::NoConfigDir)
}

impl Preferences {
    /// Read preferences from `path`.
    ///
    /// A missing or unreadable file gives the defaults. A stored folder that
    /// no longer exists is dropped.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let mut prefs: Self = match serde_json::from_str(&text) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("Ignoring corrupt preferences {}: {}", path.display(), e);
                return Self::default();
            }
        };

        prefs.output_fps = clamp_output_fps(prefs.output_fps);
        if let Some(folder) = &prefs.temp_folder {
            if !folder.is_dir() {
                warn!("Saved temp folder {} is gone, using a temporary one", folder.display());
                prefs.temp_folder = None;
            }
        }
        prefs
    }

    /// Fold the UI state at shutdown into the preferences.
    ///
    /// A kept video in a temporary folder makes that folder the working
    /// folder of the next run, so the file can be found again.
    pub fn record_exit(&mut self, session: &Session, keep: bool, output_fps: u32) {
        self.keep_reversed_video = keep;
        self.output_fps = clamp_output_fps(output_fps);
        if keep && session.owns_dir() {
            info!("Remembering {} as the working folder", session.dir().display());
            self.temp_folder = Some(session.dir().to_path_buf());
        }
    }

    /// Write preferences as pretty JSON, creating the parent folder.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        std::fs::write(path, json).map_err(write_err)?;
        info!("Saved preferences to {}", path.display());
        Ok(())
    }
}
