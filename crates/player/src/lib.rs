//! Playback of the reversed video.
//!
//! [`Transport`] maps the UI's transport buttons onto a [`MediaBackend`].
//! The default backend ([`FfmpegBackend`]) decodes RGBA frames with an ffmpeg
//! child process and paces them against a [`PlaybackClock`]; with the `vlc`
//! feature a libvlc backend is available as well.

mod clock;
mod ffmpeg;
mod transport;
#[cfg(feature = "vlc")]
mod vlc;

pub use clock::PlaybackClock;
pub use ffmpeg::{decoder_args, FfmpegBackend, FrameSource, SpawnFrames};
pub use transport::Transport;
#[cfg(feature = "vlc")]
pub use vlc::VlcBackend;

use std::path::{Path, PathBuf};

/// Errors from opening or driving a playback backend.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("No media loaded")]
    NoMedia,

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot play {}: {reason}", .path.display())]
    Unsupported { path: PathBuf, reason: String },

    #[error("Failed to start decoder: {0}")]
    Decoder(String),

    #[error(transparent)]
    Probe(#[from] rp_encoder::EncodeError),

    #[error("Playback backend error: {0}")]
    Backend(String),
}

/// Facts about the loaded media.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_ms: i64,
}

/// A decoded RGBA frame ready for display.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixel data (width * height * 4 bytes).
    pub rgba: Vec<u8>,
    /// Presentation time in milliseconds.
    pub pts_ms: i64,
}

/// Current state of a backend's playback pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackState {
    /// No file loaded.
    Idle,
    Stopped,
    Playing,
    Paused,
    /// Reached the end; holds the last frame.
    Ended,
    Error(String),
}

/// Transport operations of an embedded media player.
///
/// Times are milliseconds. Backends clamp seeks into `0..=length()`.
pub trait MediaBackend {
    fn open(&mut self, path: &Path) -> Result<MediaInfo, PlayerError>;

    /// Release the current media, returning to [`PlaybackState::Idle`].
    fn close(&mut self);

    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);

    fn set_time(&mut self, ms: i64);
    fn time(&self) -> i64;
    /// Media length, `0` when unknown or nothing is loaded.
    fn length(&self) -> i64;

    fn set_rate(&mut self, rate: f32);
    fn rate(&self) -> f32;

    fn state(&self) -> PlaybackState;

    /// The newest frame due for display since the last call, if any.
    /// Backends that render into their own window return `None`.
    fn poll_frame(&mut self) -> Option<VideoFrame>;

    /// Whether video appears in a window of the backend's own instead of
    /// through [`MediaBackend::poll_frame`].
    fn renders_externally(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_include_paths() {
        let err = PlayerError::NotFound(PathBuf::from("/tmp/reversed_final.mp4"));
        assert_eq!(err.to_string(), "File not found: /tmp/reversed_final.mp4");
    }
}
