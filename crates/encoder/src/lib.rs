//! FFmpeg side of the pipeline: probing media files and the two-step reversal.
//!
//! Every external process goes through [`ProcessRunner`], so the command
//! order and arguments can be asserted against a recording runner in tests.

mod probe;
mod progress;
mod reverse;
mod runner;

pub use probe::{parse_probe_json, probe, probe_duration, MediaProbe};
pub use progress::{parse_time_progress, percent_of};
pub use reverse::{step1_args, step1_path, step2_args, ReverseProgress, Reverser};
pub use runner::{ProcessOutput, ProcessRunner, SystemRunner};

/// Errors from ffprobe / ffmpeg invocations.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("{tool} not found. Install FFmpeg and make sure it is on PATH")]
    NotFound { tool: String },

    #[error("ffmpeg step {step} failed: {stderr_tail}")]
    Failed { step: u8, stderr_tail: String },

    #[error("ffprobe failed: {0}")]
    Probe(String),

    #[error("Failed to parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(std::io::Error),
}

impl EncodeError {
    /// Map a spawn error, turning a missing executable into [`EncodeError::NotFound`].
    pub fn from_spawn(tool: &std::path::Path, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                tool: tool.to_string_lossy().to_string(),
            }
        } else {
            Self::Io(e)
        }
    }
}
