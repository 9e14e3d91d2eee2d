use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::{EncodeError, ProcessRunner};

/// Stream and container facts needed for progress and playback.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaProbe {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    /// Frames per second, `0.0` when ffprobe could not tell.
    pub fps: f64,
}

#[derive(Deserialize)]
struct ProbeDoc {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-show_entries".to_string(),
        "stream=width,height,r_frame_rate:format=duration".to_string(),
        "-of".to_string(),
        "json".to_string(),
        path.to_string_lossy().to_string(),
    ]
}

/// Parse a rational like `30000/1001` or a plain number.
fn parse_rate(rate: &str) -> f64 {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().unwrap_or(0.0);
            let den = den.trim().parse::<f64>().unwrap_or(0.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => rate.trim().parse::<f64>().unwrap_or(0.0),
    }
}

/// Parse the JSON document printed by `ffprobe -of json`.
pub fn parse_probe_json(json: &str) -> Result<MediaProbe, EncodeError> {
    let doc: ProbeDoc = serde_json::from_str(json)?;

    let duration_secs = doc
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let stream = doc
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| EncodeError::Probe("no video stream".to_string()))?;

    Ok(MediaProbe {
        duration_secs,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps: stream.r_frame_rate.as_deref().map(parse_rate).unwrap_or(0.0),
    })
}

/// Run ffprobe on `path`.
pub fn probe(
    runner: &dyn ProcessRunner,
    ffprobe: &Path,
    path: &Path,
) -> Result<MediaProbe, EncodeError> {
    let output = runner
        .run(ffprobe, &probe_args(path), &mut |_| {})
        .map_err(|e| EncodeError::from_spawn(ffprobe, e))?;

    if !output.success {
        return Err(EncodeError::Probe(output.last_error_line()));
    }

    parse_probe_json(&output.stdout)
}

/// Duration in seconds, or `0.0` if probing fails. Only used to scale progress.
pub fn probe_duration(runner: &dyn ProcessRunner, ffprobe: &Path, path: &Path) -> f64 {
    match probe(runner, ffprobe, path) {
        Ok(info) => info.duration_secs,
        Err(e) => {
            warn!("Could not probe duration of {}: {}", path.display(), e);
            0.0
        }
    }
}
