/// Parse a yt-dlp `--newline` progress line.
///
/// Format: `[download]  45.2% of ~100.00MiB at 2.00MiB/s ETA 00:20`
pub fn parse_progress_line(line: &str) -> Option<f32> {
    let line = line.trim();
    if !line.starts_with("[download]") || !line.contains('%') {
        return None;
    }

    let before_pct = line.split('%').next()?.trim();
    let pct_part = before_pct
        .rsplit_once(' ')
        .map(|(_, p)| p)
        .unwrap_or(before_pct);

    let pct = pct_part.trim().parse::<f32>().ok()?;
    if pct.is_finite() {
        Some(pct.clamp(0.0, 100.0))
    } else {
        None
    }
}

/// Drops progress values that would move the bar backwards.
#[derive(Debug, Default)]
pub struct ProgressFilter {
    last: Option<f32>,
}

impl ProgressFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value to report, or `None` if it is a regression or repeat.
    pub fn accept(&mut self, pct: f32) -> Option<f32> {
        match self.last {
            Some(last) if pct <= last => None,
            _ => {
                self.last = Some(pct);
                Some(pct)
            }
        }
    }

    /// Report `100.0` unless it was the last value sent.
    pub fn finish(&mut self) -> Option<f32> {
        self.accept(100.0)
    }
}
