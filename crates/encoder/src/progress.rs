/// Extract the `time=HH:MM:SS.xx` position (in seconds) from an ffmpeg status line.
pub fn parse_time_progress(line: &str) -> Option<f64> {
    let (_, rest) = line.split_once("time=")?;
    let stamp = rest.split_whitespace().next()?;
    // ffmpeg can report a small negative time right after start
    if let Some(stripped) = stamp.strip_prefix('-') {
        return parse_stamp(stripped).map(|_| 0.0);
    }
    parse_stamp(stamp)
}

fn parse_stamp(stamp: &str) -> Option<f64> {
    let mut parts = stamp.split(':');
    let h = parts.next()?.parse::<f64>().ok()?;
    let m = parts.next()?.parse::<f64>().ok()?;
    let s = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(h * 3600.0 + m * 60.0 + s)
}

/// Percentage of `total` reached at `current`, clamped to `0..=100`.
/// Returns `None` when the total duration is unknown.
pub fn percent_of(current: f64, total: f64) -> Option<f32> {
    if total > 0.0 && total.is_finite() {
        Some(((current / total) * 100.0).clamp(0.0, 100.0) as f32)
    } else {
        None
    }
}
