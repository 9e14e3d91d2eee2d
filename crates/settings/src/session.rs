use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::SettingsError;

/// Prefix of working folders created when the user picked none.
pub const TEMP_PREFIX: &str = "yt_reverse_";
/// Downloaded source video.
pub const ORIGINAL_FILE: &str = "original.mp4";
/// Reversed video handed to the player.
pub const REVERSED_FILE: &str = "reversed_final.mp4";
const STEP1_FILE: &str = "reversed_final_step1.mp4";

/// The folder one run of the application works in.
///
/// Only the files named here are ever deleted. The folder itself is removed
/// only when this session created it and nothing else is left inside.
#[derive(Debug)]
pub struct Session {
    dir: PathBuf,
    owns_dir: bool,
}

impl Session {
    /// Use `preferred` when it is an existing folder, else create a fresh
    /// temporary one.
    pub fn create(preferred: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(dir) = preferred.filter(|d| d.is_dir()) {
            info!("Working folder: {}", dir.display());
            return Ok(Self {
                dir: dir.to_path_buf(),
                owns_dir: false,
            });
        }

        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(SettingsError::Workspace)?
            .keep();
        info!("Working folder (temporary): {}", dir.display());
        Ok(Self { dir, owns_dir: true })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn owns_dir(&self) -> bool {
        self.owns_dir
    }

    pub fn original_path(&self) -> PathBuf {
        self.dir.join(ORIGINAL_FILE)
    }

    pub fn reversed_path(&self) -> PathBuf {
        self.dir.join(REVERSED_FILE)
    }

    fn produced(&self) -> [PathBuf; 3] {
        [
            self.original_path(),
            self.dir.join(STEP1_FILE),
            self.reversed_path(),
        ]
    }

    /// Make sure the folder exists and holds no output of an earlier run.
    pub fn prepare(&self) -> Result<(), SettingsError> {
        std::fs::create_dir_all(&self.dir).map_err(SettingsError::Workspace)?;
        for path in self.produced() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SettingsError::Workspace(e)),
            }
        }
        Ok(())
    }

    /// Clean up at shutdown. With `keep` nothing is touched.
    ///
    /// Returns the paths that were deleted.
    pub fn finish(&self, keep: bool) -> Vec<PathBuf> {
        if keep {
            info!("Keeping {}", self.reversed_path().display());
            return Vec::new();
        }

        let mut removed = Vec::new();
        for path in self.produced() {
            match std::fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not delete {}: {}", path.display(), e),
            }
        }

        if self.owns_dir {
            match std::fs::remove_dir(&self.dir) {
                Ok(()) => removed.push(self.dir.clone()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Left working folder {} in place: {}", self.dir.display(), e),
            }
        }

        info!("Cleaned up {} item(s) in {}", removed.len(), self.dir.display());
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch_outputs(session: &Session) {
        for path in session.produced() {
            std::fs::write(path, b"video").unwrap();
        }
    }

    #[test]
    fn preferred_folder_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::create(Some(dir.path())).unwrap();
        assert_eq!(session.dir(), dir.path());
        assert!(!session.owns_dir());
        assert_eq!(session.original_path(), dir.path().join("original.mp4"));
        assert_eq!(session.reversed_path(), dir.path().join("reversed_final.mp4"));
    }

    #[test]
    fn missing_preferred_folder_falls_back_to_temp() {
        let session = Session::create(Some(Path::new("/no/such/folder"))).unwrap();
        assert!(session.owns_dir());
        let name = session.dir().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(TEMP_PREFIX));
        session.finish(false);
        assert!(!session.dir().exists());
    }

    #[test]
    fn prepare_removes_stale_outputs_only() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::create(Some(dir.path())).unwrap();
        touch_outputs(&session);
        let unrelated = dir.path().join("notes.txt");
        std::fs::write(&unrelated, b"keep me").unwrap();

        session.prepare().unwrap();
        assert!(!session.original_path().exists());
        assert!(!session.reversed_path().exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn finish_deletes_outputs_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::create(Some(dir.path())).unwrap();

        touch_outputs(&session);
        assert!(session.finish(true).is_empty());
        assert!(session.reversed_path().exists());

        let removed = session.finish(false);
        assert_eq!(removed.len(), 3);
        assert!(!session.original_path().exists());
        assert!(!session.reversed_path().exists());
        assert!(!dir.path().join(STEP1_FILE).exists());
    }

    #[test]
    fn user_folder_is_never_removed() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::create(Some(dir.path())).unwrap();
        touch_outputs(&session);
        session.finish(false);
        assert!(dir.path().is_dir());
    }

    #[test]
    fn owned_folder_with_foreign_files_is_left_in_place() {
        let session = Session::create(None).unwrap();
        touch_outputs(&session);
        let foreign = session.dir().join("other.mp4");
        std::fs::write(&foreign, b"x").unwrap();

        session.finish(false);
        assert!(foreign.exists());
        assert!(!session.reversed_path().exists());

        std::fs::remove_dir_all(session.dir()).unwrap();
    }

    #[test]
    fn owned_folder_is_removed_when_empty() {
        let session = Session::create(None).unwrap();
        touch_outputs(&session);
        let removed = session.finish(false);
        assert!(removed.contains(&session.dir().to_path_buf()));
        assert!(!session.dir().exists());
    }
}
