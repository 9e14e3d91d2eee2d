use std::path::Path;

use rp_common::{clamp_playback_rate, format_time_ms};
use tracing::{debug, info};

use crate::{MediaBackend, MediaInfo, PlaybackState, PlayerError, VideoFrame};

/// Transport controls over a [`MediaBackend`].
///
/// Frame stepping moves by one frame of the encode rate the loaded video was
/// produced with, so changing the FPS slider later does not affect it.
pub struct Transport {
    backend: Box<dyn MediaBackend>,
    fps: u32,
    loaded: bool,
    /// Set by [`Transport::stop`]; the time display reads `0:00 / 0:00`
    /// until playback or a seek resumes.
    stopped: bool,
}

impl Transport {
    pub fn new(backend: Box<dyn MediaBackend>) -> Self {
        Self {
            backend,
            fps: 0,
            loaded: false,
            stopped: false,
        }
    }

    /// Open `path` encoded at `fps` and leave it stopped at 0.
    pub fn load(&mut self, path: &Path, fps: u32) -> Result<MediaInfo, PlayerError> {
        self.unload();
        let media = self.backend.open(path)?;
        self.fps = fps;
        self.loaded = true;
        self.stopped = false;
        info!("Loaded {} for playback ({} fps)", path.display(), fps);
        Ok(media)
    }

    pub fn unload(&mut self) {
        if self.loaded {
            self.backend.close();
            self.loaded = false;
            self.stopped = false;
            self.fps = 0;
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn play(&mut self) {
        if self.loaded {
            self.stopped = false;
            self.backend.play();
        }
    }

    pub fn pause(&mut self) {
        if self.loaded {
            self.backend.pause();
        }
    }

    pub fn toggle_play_pause(&mut self) {
        if self.state() == PlaybackState::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn stop(&mut self) {
        if self.loaded {
            self.backend.stop();
            self.stopped = true;
        }
    }

    /// Milliseconds covered by one frame, `None` without a usable rate.
    pub fn frame_ms(&self) -> Option<i64> {
        if self.fps == 0 {
            None
        } else {
            Some(1000 / self.fps as i64)
        }
    }

    pub fn next_frame(&mut self) {
        self.step(1);
    }

    pub fn prev_frame(&mut self) {
        self.step(-1);
    }

    fn step(&mut self, direction: i64) {
        if !self.loaded {
            return;
        }
        let Some(frame_ms) = self.frame_ms() else { return };
        let target = self.backend.time() + direction * frame_ms;
        debug!("Frame step to {} ms", target);
        self.scrub(target);
    }

    /// Seek to `ms`, clamped into the media.
    pub fn scrub(&mut self, ms: i64) {
        if !self.loaded {
            return;
        }
        let length = self.backend.length();
        let ms = if length > 0 { ms.clamp(0, length) } else { ms.max(0) };
        self.stopped = false;
        self.backend.set_time(ms);
    }

    /// Set the playback rate, snapped to 0.1 within the supported range.
    pub fn set_speed(&mut self, rate: f32) -> f32 {
        let rate = clamp_playback_rate(rate);
        self.backend.set_rate(rate);
        rate
    }

    pub fn speed(&self) -> f32 {
        self.backend.rate()
    }

    pub fn speed_label(&self) -> String {
        format!("{:.1}x", self.speed())
    }

    pub fn time_ms(&self) -> i64 {
        if self.loaded {
            self.backend.time()
        } else {
            0
        }
    }

    pub fn length_ms(&self) -> i64 {
        if self.loaded {
            self.backend.length()
        } else {
            0
        }
    }

    /// `current / total` as `m:ss / m:ss`; `0:00 / 0:00` after a stop.
    pub fn time_label(&self) -> String {
        if self.stopped {
            return format!("{} / {}", format_time_ms(0), format_time_ms(0));
        }
        format!(
            "{} / {}",
            format_time_ms(self.time_ms()),
            format_time_ms(self.length_ms())
        )
    }

    pub fn state(&self) -> PlaybackState {
        if self.loaded {
            self.backend.state()
        } else {
            PlaybackState::Idle
        }
    }

    /// Loaded media plays in the backend's own window.
    pub fn renders_externally(&self) -> bool {
        self.loaded && self.backend.renders_externally()
    }

    pub fn poll_frame(&mut self) -> Option<VideoFrame> {
        if self.loaded {
            self.backend.poll_frame()
        } else {
            None
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorded {
        calls: Vec<String>,
        time: i64,
        rate: f32,
        state: Option<PlaybackState>,
    }

    /// Backend that records calls and keeps a settable position.
    struct MockBackend {
        rec: Arc<Mutex<Recorded>>,
        length: i64,
        external: bool,
    }

    impl MockBackend {
        fn new(length: i64) -> (Self, Arc<Mutex<Recorded>>) {
            let rec = Arc::new(Mutex::new(Recorded {
                rate: 1.0,
                ..Default::default()
            }));
            (
                Self {
                    rec: rec.clone(),
                    length,
                    external: false,
                },
                rec,
            )
        }

        fn log(&self, call: impl Into<String>) {
            self.rec.lock().calls.push(call.into());
        }
    }

    impl MediaBackend for MockBackend {
        fn open(&mut self, path: &Path) -> Result<MediaInfo, PlayerError> {
            self.log("open");
            if path.ends_with("missing.mp4") {
                return Err(PlayerError::NotFound(path.to_path_buf()));
            }
            self.rec.lock().state = Some(PlaybackState::Stopped);
            Ok(MediaInfo {
                path: path.to_path_buf(),
                width: 64,
                height: 36,
                fps: 10.0,
                duration_ms: self.length,
            })
        }
        fn close(&mut self) {
            self.log("close");
        }
        fn play(&mut self) {
            self.log("play");
            self.rec.lock().state = Some(PlaybackState::Playing);
        }
        fn pause(&mut self) {
            self.log("pause");
            self.rec.lock().state = Some(PlaybackState::Paused);
        }
        fn stop(&mut self) {
            self.log("stop");
            let mut rec = self.rec.lock();
            rec.time = 0;
            rec.state = Some(PlaybackState::Stopped);
        }
        fn set_time(&mut self, ms: i64) {
            self.log(format!("set_time {}", ms));
            self.rec.lock().time = ms;
        }
        fn time(&self) -> i64 {
            self.rec.lock().time
        }
        fn length(&self) -> i64 {
            self.length
        }
        fn set_rate(&mut self, rate: f32) {
            self.rec.lock().rate = rate;
        }
        fn rate(&self) -> f32 {
            self.rec.lock().rate
        }
        fn state(&self) -> PlaybackState {
            self.rec.lock().state.clone().unwrap_or(PlaybackState::Idle)
        }
        fn poll_frame(&mut self) -> Option<VideoFrame> {
            None
        }
        fn renders_externally(&self) -> bool {
            self.external
        }
    }

    fn loaded(length: i64, fps: u32) -> (Transport, Arc<Mutex<Recorded>>) {
        let (backend, rec) = MockBackend::new(length);
        let mut transport = Transport::new(Box::new(backend));
        transport.load(&PathBuf::from("reversed_final.mp4"), fps).unwrap();
        (transport, rec)
    }

    #[test]
    fn frame_step_uses_encode_fps() {
        let (mut t, _) = loaded(10_000, 10);
        t.scrub(1000);
        t.next_frame();
        assert_eq!(t.time_ms(), 1100);
        t.prev_frame();
        t.prev_frame();
        assert_eq!(t.time_ms(), 900);

        let (mut t, _) = loaded(10_000, 30);
        t.next_frame();
        assert_eq!(t.time_ms(), 33);
    }

    #[test]
    fn frame_step_clamps_at_both_ends() {
        let (mut t, _) = loaded(1000, 10);
        t.prev_frame();
        assert_eq!(t.time_ms(), 0);

        t.scrub(950);
        t.next_frame();
        assert_eq!(t.time_ms(), 1000);
    }

    #[test]
    fn scrub_clamps_into_media() {
        let (mut t, _) = loaded(5000, 10);
        t.scrub(-10);
        assert_eq!(t.time_ms(), 0);
        t.scrub(60_000);
        assert_eq!(t.time_ms(), 5000);
    }

    #[test]
    fn speed_is_snapped_and_labelled() {
        let (mut t, _) = loaded(5000, 10);
        assert_eq!(t.set_speed(1.26), 1.3);
        assert_eq!(t.speed_label(), "1.3x");
        assert_eq!(t.set_speed(9.0), 3.0);
        assert_eq!(t.set_speed(0.0), 0.1);
    }

    #[test]
    fn toggle_switches_between_play_and_pause() {
        let (mut t, rec) = loaded(5000, 10);
        t.toggle_play_pause();
        assert_eq!(t.state(), PlaybackState::Playing);
        t.toggle_play_pause();
        assert_eq!(t.state(), PlaybackState::Paused);

        let calls = rec.lock().calls.clone();
        assert_eq!(calls, vec!["open", "play", "pause"]);
    }

    #[test]
    fn stop_rewinds() {
        let (mut t, _) = loaded(5000, 10);
        t.scrub(2500);
        t.play();
        t.stop();
        assert_eq!(t.time_ms(), 0);
        assert_eq!(t.state(), PlaybackState::Stopped);
    }

    #[test]
    fn stop_resets_time_display_until_playback_resumes() {
        let (mut t, _) = loaded(125_000, 10);
        t.scrub(61_000);
        t.stop();
        assert_eq!(t.time_label(), "0:00 / 0:00");
        assert_eq!(t.length_ms(), 125_000);

        t.play();
        assert_eq!(t.time_label(), "0:00 / 2:05");

        t.stop();
        t.scrub(1000);
        assert_eq!(t.time_label(), "0:01 / 2:05");
    }

    #[test]
    fn time_label_formats_current_and_total() {
        let (mut t, _) = loaded(125_000, 10);
        t.scrub(61_000);
        assert_eq!(t.time_label(), "1:01 / 2:05");
    }

    #[test]
    fn controls_are_inert_without_media() {
        let (backend, rec) = MockBackend::new(5000);
        let mut t = Transport::new(Box::new(backend));
        t.play();
        t.next_frame();
        t.scrub(100);
        t.stop();
        assert!(rec.lock().calls.is_empty());
        assert_eq!(t.state(), PlaybackState::Idle);
        assert_eq!(t.time_label(), "0:00 / 0:00");
    }

    #[test]
    fn failed_load_leaves_transport_unloaded() {
        let (backend, _) = MockBackend::new(5000);
        let mut t = Transport::new(Box::new(backend));
        let err = t.load(Path::new("missing.mp4"), 10).unwrap_err();
        assert!(matches!(err, PlayerError::NotFound(_)));
        assert!(!t.is_loaded());
    }

    #[test]
    fn reload_closes_previous_media() {
        let (mut t, rec) = loaded(5000, 10);
        t.load(Path::new("other.mp4"), 20).unwrap();
        assert_eq!(t.fps(), 20);
        let calls = rec.lock().calls.clone();
        assert_eq!(calls, vec!["open", "close", "open"]);
    }

    #[test]
    fn external_rendering_is_reported_only_with_media() {
        let (mut backend, _) = MockBackend::new(5000);
        backend.external = true;
        let mut t = Transport::new(Box::new(backend));
        assert!(!t.renders_externally());
        t.load(Path::new("reversed_final.mp4"), 10).unwrap();
        assert!(t.renders_externally());

        let (t, _) = loaded(5000, 10);
        assert!(!t.renders_externally());
    }
}
