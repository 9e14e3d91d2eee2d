/// Format seconds as `m:ss`. Minutes are not padded and keep growing past 59.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };
    let m = (seconds / 60.0).floor() as u64;
    let s = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", m, s)
}

/// Same as [`format_time`] for a millisecond position.
pub fn format_time_ms(ms: i64) -> String {
    format_time(ms as f64 / 1000.0)
}
