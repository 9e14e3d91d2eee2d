//! Two-step reversal
//!
//! 1. Reverse the frame order and zero the timestamps -> `<stem>_step1.mp4`
//! 2. Re-encode the intermediate at the requested frame rate -> output
//!
//! Splitting the work keeps the presentation timestamps monotonic from zero,
//! which players need for scrubbing. No audio track is written.

use std::path::{Path, PathBuf};

use rp_common::ToolPaths;
use tracing::{info, warn};

use crate::probe::probe_duration;
use crate::progress::{parse_time_progress, percent_of};
use crate::{EncodeError, ProcessRunner};

/// Encoder settings shared by both steps.
const ENCODE_ARGS: [&str; 10] = [
    "-avoid_negative_ts", "make_zero",
    "-c:v", "libx264",
    "-preset", "ultrafast",
    "-crf", "36",
    "-threads", "2",
];

/// Progress of one reversal step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReverseProgress {
    /// 1 or 2.
    pub step: u8,
    pub percent: f32,
}

/// Path of the intermediate file for `output`.
pub fn step1_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "reversed".to_string());
    output.with_file_name(format!("{}_step1.mp4", stem))
}

fn encode_args(input: &Path, filter: String, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".to_string(),
        "-fflags".to_string(),
        "+genpts".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-vf".to_string(),
        filter,
        "-an".to_string(),
    ];
    args.extend(ENCODE_ARGS.iter().map(|s| s.to_string()));
    args.push(output.to_string_lossy().to_string());
    args
}

/// ffmpeg arguments for step 1 (frame order reversal).
pub fn step1_args(input: &Path, step1: &Path) -> Vec<String> {
    encode_args(input, "reverse,setpts=PTS-STARTPTS".to_string(), step1)
}

/// ffmpeg arguments for step 2 (frame rate re-encode).
pub fn step2_args(step1: &Path, output: &Path, fps: u32) -> Vec<String> {
    encode_args(step1, format!("fps={},setpts=PTS-STARTPTS", fps), output)
}

/// Runs the two ffmpeg steps through a [`ProcessRunner`].
pub struct Reverser<R> {
    runner: R,
    tools: ToolPaths,
}

impl<R: ProcessRunner> Reverser<R> {
    pub fn new(runner: R, tools: ToolPaths) -> Self {
        Self { runner, tools }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Reverse `input` into `output` at `fps` frames per second.
    ///
    /// Step 2 only runs after step 1 succeeded. Progress restarts at 0 for
    /// step 2. The intermediate file is removed once step 2 succeeds.
    pub fn reverse(
        &self,
        input: &Path,
        output: &Path,
        fps: u32,
        on_progress: &mut dyn FnMut(ReverseProgress),
    ) -> Result<(), EncodeError> {
        let step1 = step1_path(output);

        info!("Reversal step 1: {} -> {}", input.display(), step1.display());
        let total = probe_duration(&self.runner, &self.tools.ffprobe, input);
        self.run_step(1, &step1_args(input, &step1), total, on_progress)?;

        info!("Reversal step 2 ({} fps): {} -> {}", fps, step1.display(), output.display());
        on_progress(ReverseProgress { step: 2, percent: 0.0 });
        let total = probe_duration(&self.runner, &self.tools.ffprobe, &step1);
        self.run_step(2, &step2_args(&step1, output, fps), total, on_progress)?;

        if let Err(e) = std::fs::remove_file(&step1) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove {}: {}", step1.display(), e);
            }
        }

        info!("Reversed video written to {}", output.display());
        Ok(())
    }

    fn run_step(
        &self,
        step: u8,
        args: &[String],
        total_secs: f64,
        on_progress: &mut dyn FnMut(ReverseProgress),
    ) -> Result<(), EncodeError> {
        let output = self
            .runner
            .run(&self.tools.ffmpeg, args, &mut |line| {
                if let Some(percent) = parse_time_progress(line).and_then(|t| percent_of(t, total_secs)) {
                    on_progress(ReverseProgress { step, percent });
                }
            })
            .map_err(|e| EncodeError::from_spawn(&self.tools.ffmpeg, e))?;

        if !output.success {
            return Err(EncodeError::Failed {
                step,
                stderr_tail: output.last_error_line(),
            });
        }

        on_progress(ReverseProgress { step, percent: 100.0 });
        Ok(())
    }
}
