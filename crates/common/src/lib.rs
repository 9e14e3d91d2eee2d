//! Value types shared by the download, encoder, player and UI crates.

mod progress;
mod time;

pub use progress::{ProgressState, Stage};
pub use time::{format_time, format_time_ms};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Highest video height offered in the resolution selector.
pub const MAX_HEIGHT: u32 = 1024;

/// Bounds of the reversal frame-rate slider.
pub const MIN_OUTPUT_FPS: u32 = 5;
pub const MAX_OUTPUT_FPS: u32 = 30;
pub const DEFAULT_OUTPUT_FPS: u32 = 10;

/// Bounds of the playback speed slider.
pub const MIN_PLAYBACK_RATE: f32 = 0.1;
pub const MAX_PLAYBACK_RATE: f32 = 3.0;

/// A downloadable video rendition reported by yt-dlp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOption {
    pub height: u32,
    /// Opaque yt-dlp format token, passed back verbatim to `-f`.
    pub format_id: String,
}

impl FormatOption {
    pub fn new(height: u32, format_id: impl Into<String>) -> Self {
        Self {
            height,
            format_id: format_id.into(),
        }
    }

    /// Label shown in the resolution combo box, e.g. `720p (id=136)`.
    pub fn label(&self) -> String {
        format!("{}p (id={})", self.height, self.format_id)
    }
}

/// Locations of the external executables, resolved once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolPaths {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            yt_dlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Clamp a user supplied reversal frame rate into the slider range.
pub fn clamp_output_fps(fps: u32) -> u32 {
    fps.clamp(MIN_OUTPUT_FPS, MAX_OUTPUT_FPS)
}

/// Clamp a playback rate and snap it to the slider's 0.1 resolution.
pub fn clamp_playback_rate(rate: f32) -> f32 {
    if !rate.is_finite() {
        return 1.0;
    }
    let snapped = (rate * 10.0).round() / 10.0;
    snapped.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_label_includes_height_and_id() {
        assert_eq!(FormatOption::new(720, "136").label(), "720p (id=136)");
        assert_eq!(FormatOption::new(144, "160").label(), "144p (id=160)");
    }

    #[test]
    fn output_fps_is_clamped_to_slider_range() {
        assert_eq!(clamp_output_fps(0), 5);
        assert_eq!(clamp_output_fps(12), 12);
        assert_eq!(clamp_output_fps(60), 30);
    }

    #[test]
    fn playback_rate_snaps_to_tenths() {
        assert!((clamp_playback_rate(1.04) - 1.0).abs() < 1e-6);
        assert!((clamp_playback_rate(0.26) - 0.3).abs() < 1e-6);
        assert!((clamp_playback_rate(0.0) - 0.1).abs() < 1e-6);
        assert!((clamp_playback_rate(9.0) - 3.0).abs() < 1e-6);
        assert!((clamp_playback_rate(f32::NAN) - 1.0).abs() < 1e-6);
    }
}
