use std::time::Instant;

/// Rate-scaled wall clock driving frame presentation.
///
/// While running, the position advances by `elapsed * rate`. Every change of
/// rate or run state rebases the clock so earlier time is never re-scaled.
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    base_ms: f64,
    started: Option<Instant>,
    rate: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            base_ms: 0.0,
            started: None,
            rate: 1.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn position_at(&self, now: Instant) -> f64 {
        match self.started {
            Some(start) => {
                let elapsed_ms = now.saturating_duration_since(start).as_secs_f64() * 1000.0;
                self.base_ms + elapsed_ms * self.rate
            }
            None => self.base_ms,
        }
    }

    pub fn position(&self) -> f64 {
        self.position_at(Instant::now())
    }

    pub fn start_at(&mut self, now: Instant) {
        if self.started.is_none() {
            self.started = Some(now);
        }
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        self.base_ms = self.position_at(now);
        self.started = None;
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    /// Jump to `ms`, keeping the run state.
    pub fn seek_at(&mut self, ms: f64, now: Instant) {
        self.base_ms = ms;
        if self.started.is_some() {
            self.started = Some(now);
        }
    }

    pub fn seek(&mut self, ms: f64) {
        self.seek_at(ms, Instant::now());
    }

    pub fn set_rate_at(&mut self, rate: f64, now: Instant) {
        if self.started.is_some() {
            self.base_ms = self.position_at(now);
            self.started = Some(now);
        }
        self.rate = rate;
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.set_rate_at(rate, Instant::now());
    }
}
