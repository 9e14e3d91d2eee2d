//! Video download module using yt-dlp
//!
//! Lists the video renditions available for a URL and downloads one of them
//! to a fixed path while streaming percentage progress to a callback.

mod formats;
mod progress;
mod ytdlp;

use std::path::Path;

use rp_common::{FormatOption, MAX_HEIGHT};

pub use formats::select_formats;
pub use progress::{parse_progress_line, ProgressFilter};
pub use ytdlp::{find_deno, find_ytdlp, get_deno_args, YtDlp};

/// Errors from listing or downloading a video.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("URL must start with http:// or https://")]
    InvalidUrl,

    #[error("yt-dlp not found. Install with: pip install yt-dlp")]
    YtDlpNotFound,

    #[error("No valid video formats <= {}p found.", MAX_HEIGHT)]
    NoFormats,

    #[error("Failed to parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("yt-dlp failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The video-fetch side of the pipeline.
///
/// Implemented by [`YtDlp`]; the application worker only sees this trait so it
/// can be driven by a scripted source in tests.
pub trait VideoSource: Send + Sync {
    /// Available renditions, deduplicated by height, ascending.
    fn list_formats(&self, url: &str) -> Result<Vec<FormatOption>, DownloadError>;

    /// Download `format_id` of `url` to exactly `dest`.
    ///
    /// `on_progress` receives non-decreasing percentages and ends with `100.0`
    /// on success.
    fn download(
        &self,
        url: &str,
        format_id: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<(), DownloadError>;
}

/// Reject anything that is not an http(s) URL before spawning yt-dlp.
pub fn validate_url(url: &str) -> Result<(), DownloadError> {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(DownloadError::InvalidUrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_accepts_http_and_https() {
        assert!(validate_url("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(validate_url("  http://example.com/v ").is_ok());
    }

    #[test]
    fn validate_url_rejects_other_schemes() {
        assert!(matches!(validate_url("ftp://x"), Err(DownloadError::InvalidUrl)));
        assert!(matches!(validate_url("youtube.com/watch"), Err(DownloadError::InvalidUrl)));
        assert!(matches!(validate_url(""), Err(DownloadError::InvalidUrl)));
    }

    #[test]
    fn no_formats_message_mentions_height_cap() {
        assert_eq!(
            DownloadError::NoFormats.to_string(),
            "No valid video formats <= 1024p found."
        );
    }
}
