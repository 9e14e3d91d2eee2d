/// Pipeline stage a progress value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Downloading,
    /// Reversal step, 1 (reverse frames) or 2 (re-encode at target fps).
    Reversing(u8),
    Done,
}

impl Stage {
    pub fn label(&self) -> String {
        match self {
            Self::Downloading => "Downloading...".to_string(),
            Self::Reversing(step) => format!("Reversing (step {}/2)...", step),
            Self::Done => "Reverse done.".to_string(),
        }
    }
}

/// State behind the progress label and bar.
///
/// Percentages are clamped to `0..=100`. A free-form status message replaces
/// the label until the next progress update.
#[derive(Clone, Debug, Default)]
pub struct ProgressState {
    percent: f32,
    message: String,
    status: Option<String>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the bar. `message` may be empty.
    pub fn set(&mut self, percent: f32, message: impl Into<String>) {
        let percent = if percent.is_nan() { 0.0 } else { percent };
        self.percent = percent.clamp(0.0, 100.0);
        self.message = message.into();
        self.status = None;
    }

    /// Show a status line without touching the bar position.
    pub fn log(&mut self, text: impl Into<String>) {
        self.status = Some(text.into());
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    /// Bar fill in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        self.percent / 100.0
    }

    /// `"{msg} ({pct:.1}%)"`, or `"{pct:.1}%"` when there is no message.
    /// A pending status line takes precedence.
    pub fn label(&self) -> String {
        if let Some(ref status) = self.status {
            return status.clone();
        }
        if self.message.is_empty() {
            format!("{:.1}%", self.percent)
        } else {
            format!("{} ({:.1}%)", self.message, self.percent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_with_and_without_message() {
        let mut p = ProgressState::new();
        p.set(42.3, "Downloading...");
        assert_eq!(p.label(), "Downloading... (42.3%)");
        p.set(7.0, "");
        assert_eq!(p.label(), "7.0%");
    }

    #[test]
    fn percent_is_clamped() {
        let mut p = ProgressState::new();
        p.set(-5.0, "");
        assert_eq!(p.percent(), 0.0);
        p.set(250.0, "");
        assert_eq!(p.percent(), 100.0);
        p.set(f32::NAN, "");
        assert_eq!(p.percent(), 0.0);
    }

    #[test]
    fn status_overrides_label_until_next_update() {
        let mut p = ProgressState::new();
        p.set(50.0, "Reversing...");
        p.log("Download done. Now reversing in two steps...");
        assert_eq!(p.label(), "Download done. Now reversing in two steps...");
        assert_eq!(p.percent(), 50.0);
        p.set(60.0, "Reversing...");
        assert_eq!(p.label(), "Reversing... (60.0%)");
    }

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::Downloading.label(), "Downloading...");
        assert_eq!(Stage::Reversing(2).label(), "Reversing (step 2/2)...");
        assert_eq!(Stage::Done.label(), "Reverse done.");
    }
}
