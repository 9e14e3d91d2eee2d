//! ffmpeg-pipe playback backend
//!
//! ```text
//! UI thread                          decode thread
//! ┌──────────────────┐              ┌──────────────────────┐
//! │ poll_frame()     │◄── frames ───│ read rawvideo stdout │
//! │  - clock         │   bounded    │  of `ffmpeg -ss t`   │
//! │  - present due   │   channel    └──────────────────────┘
//! └──────────────────┘
//! ```
//!
//! Seeking drops the current [`FrameSource`] (killing its ffmpeg child) and
//! starts a new one at the target time. The bounded channel throttles the
//! decoder to the presentation rate.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use rp_encoder::SystemRunner;
use tracing::{debug, error, info, warn};

use crate::{MediaBackend, MediaInfo, PlaybackClock, PlaybackState, PlayerError, VideoFrame};

/// Decoded frames buffered ahead of presentation.
const FRAME_QUEUE: usize = 4;

/// Frame rate assumed when the container does not report one.
const FALLBACK_FPS: f64 = 25.0;

/// Starts a frame source for `info` at a millisecond position.
pub type SpawnFrames = Box<dyn Fn(&MediaInfo, i64) -> Result<FrameSource, PlayerError> + Send>;

/// ffmpeg arguments decoding `path` from `start_ms` to raw RGBA on stdout.
pub fn decoder_args(path: &Path, start_ms: i64) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-nostdin".to_string(),
        "-ss".to_string(),
        format!("{:.3}", start_ms.max(0) as f64 / 1000.0),
        "-i".to_string(),
        path.to_string_lossy().to_string(),
        "-an".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "pipe:1".to_string(),
    ]
}

/// Read whole RGBA frames from `reader` until EOF or the receiver hangs up.
fn read_frames<R: Read>(
    mut reader: R,
    width: u32,
    height: u32,
    fps: f64,
    start_ms: i64,
    tx: Sender<VideoFrame>,
) -> u64 {
    let frame_len = width as usize * height as usize * 4;
    let mut n: u64 = 0;

    loop {
        let mut rgba = vec![0u8; frame_len];
        if reader.read_exact(&mut rgba).is_err() {
            break;
        }

        let pts_ms = start_ms + (n as f64 * 1000.0 / fps).round() as i64;
        let frame = VideoFrame {
            width,
            height,
            rgba,
            pts_ms,
        };
        if tx.send(frame).is_err() {
            break;
        }
        n += 1;
    }

    n
}

/// A running decoder feeding frames through a bounded channel.
pub struct FrameSource {
    rx: Option<Receiver<VideoFrame>>,
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
}

impl FrameSource {
    /// Spawn `ffmpeg` decoding `info.path` from `start_ms`.
    pub fn spawn(ffmpeg: &Path, info: &MediaInfo, start_ms: i64) -> Result<Self, PlayerError> {
        let args = decoder_args(&info.path, start_ms);
        debug!("decoder args: {:?}", args);

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PlayerError::Decoder(format!("{} not found", ffmpeg.display()))
                } else {
                    PlayerError::Decoder(e.to_string())
                }
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PlayerError::Decoder("decoder stdout unavailable".to_string()));
            }
        };

        let (tx, rx) = channel::bounded(FRAME_QUEUE);
        let (width, height, fps) = (info.width, info.height, effective_fps(info.fps));

        let reader = thread::Builder::new()
            .name("rp-decode".to_string())
            .spawn(move || {
                let frames = read_frames(stdout, width, height, fps, start_ms, tx);
                debug!("decode thread finished after {} frames", frames);
            });

        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PlayerError::Decoder(e.to_string()));
            }
        };

        Ok(Self {
            rx: Some(rx),
            child: Some(child),
            reader: Some(reader),
        })
    }

    /// Wrap frames produced by a thread that owns no child process.
    pub fn from_thread(rx: Receiver<VideoFrame>, reader: JoinHandle<()>) -> Self {
        Self {
            rx: Some(rx),
            child: None,
            reader: Some(reader),
        }
    }

    /// Next decoded frame, if one is ready.
    pub fn try_recv(&mut self) -> Option<VideoFrame> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx.take();
                None
            }
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        // Hang up first so a reader blocked on a full channel wakes up.
        self.rx.take();
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

fn effective_fps(fps: f64) -> f64 {
    if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        FALLBACK_FPS
    }
}

/// [`MediaBackend`] decoding with an ffmpeg child process.
pub struct FfmpegBackend {
    ffprobe: PathBuf,
    spawn: SpawnFrames,
    info: Option<MediaInfo>,
    clock: PlaybackClock,
    state: PlaybackState,
    source: Option<FrameSource>,
    /// First frame that was not yet due at the last poll.
    pending: Option<VideoFrame>,
    /// Show the next decoded frame regardless of its timestamp (after a seek).
    need_frame: bool,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf) -> Self {
        let spawn: SpawnFrames =
            Box::new(move |info, start_ms| FrameSource::spawn(&ffmpeg, info, start_ms));
        Self::with_spawner(ffprobe, spawn)
    }

    pub fn with_spawner(ffprobe: PathBuf, spawn: SpawnFrames) -> Self {
        Self {
            ffprobe,
            spawn,
            info: None,
            clock: PlaybackClock::new(),
            state: PlaybackState::Idle,
            source: None,
            pending: None,
            need_frame: false,
        }
    }

    /// Load media whose properties are already known.
    pub fn open_info(&mut self, info: MediaInfo) {
        self.close();
        let rate = self.clock.rate();
        self.clock = PlaybackClock::new();
        self.clock.set_rate(rate);
        info!(
            "Opened {} ({}x{} @ {:.2} fps, {} ms)",
            info.path.display(),
            info.width,
            info.height,
            info.fps,
            info.duration_ms
        );
        self.info = Some(info);
        self.state = PlaybackState::Stopped;
        self.restart(0);
    }

    fn restart(&mut self, start_ms: i64) {
        self.source = None;
        self.pending = None;
        self.need_frame = true;

        let Some(ref info) = self.info else { return };
        match (self.spawn)(info, start_ms) {
            Ok(source) => self.source = Some(source),
            Err(e) => {
                error!("Decoder start failed: {}", e);
                self.clock.pause();
                self.state = PlaybackState::Error(e.to_string());
            }
        }
    }

    fn frame_ms(&self) -> f64 {
        let fps = self.info.as_ref().map(|i| i.fps).unwrap_or(FALLBACK_FPS);
        1000.0 / effective_fps(fps)
    }
}

impl MediaBackend for FfmpegBackend {
    fn open(&mut self, path: &Path) -> Result<MediaInfo, PlayerError> {
        if !path.exists() {
            return Err(PlayerError::NotFound(path.to_path_buf()));
        }

        let probe = rp_encoder::probe(&SystemRunner, &self.ffprobe, path)?;
        if probe.width == 0 || probe.height == 0 {
            return Err(PlayerError::Unsupported {
                path: path.to_path_buf(),
                reason: "video stream has no dimensions".to_string(),
            });
        }

        let info = MediaInfo {
            path: path.to_path_buf(),
            width: probe.width,
            height: probe.height,
            fps: effective_fps(probe.fps),
            duration_ms: (probe.duration_secs * 1000.0).round() as i64,
        };
        self.open_info(info.clone());
        Ok(info)
    }

    fn close(&mut self) {
        self.source = None;
        self.pending = None;
        self.need_frame = false;
        self.info = None;
        self.clock.pause();
        self.clock.seek(0.0);
        self.state = PlaybackState::Idle;
    }

    fn play(&mut self) {
        if self.info.is_none() {
            return;
        }
        let at_end = self.length() > 0 && self.time() >= self.length();
        if self.state == PlaybackState::Ended || at_end {
            self.clock.seek(0.0);
            self.restart(0);
        } else if self.source.is_none() {
            let now = self.time();
            self.restart(now);
        }
        if matches!(self.state, PlaybackState::Error(_)) {
            return;
        }
        self.clock.start();
        self.state = PlaybackState::Playing;
    }

    fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.clock.pause();
            self.state = PlaybackState::Paused;
        }
    }

    fn stop(&mut self) {
        if self.info.is_none() {
            return;
        }
        self.clock.pause();
        self.clock.seek(0.0);
        self.state = PlaybackState::Stopped;
        self.restart(0);
    }

    fn set_time(&mut self, ms: i64) {
        if self.info.is_none() {
            return;
        }
        let length = self.length();
        let ms = if length > 0 { ms.clamp(0, length) } else { ms.max(0) };
        self.clock.seek(ms as f64);
        if self.state == PlaybackState::Ended {
            self.state = PlaybackState::Paused;
        }
        self.restart(ms);
    }

    fn time(&self) -> i64 {
        if self.info.is_none() {
            return 0;
        }
        let pos = self.clock.position().max(0.0) as i64;
        let length = self.length();
        if length > 0 {
            pos.min(length)
        } else {
            pos
        }
    }

    fn length(&self) -> i64 {
        self.info.as_ref().map(|i| i.duration_ms.max(0)).unwrap_or(0)
    }

    fn set_rate(&mut self, rate: f32) {
        if rate.is_finite() && rate > 0.0 {
            self.clock.set_rate(rate as f64);
        } else {
            warn!("Ignoring playback rate {}", rate);
        }
    }

    fn rate(&self) -> f32 {
        self.clock.rate() as f32
    }

    fn state(&self) -> PlaybackState {
        self.state.clone()
    }

    fn poll_frame(&mut self) -> Option<VideoFrame> {
        self.info.as_ref()?;

        let length = self.length();
        let mut now = self.clock.position();
        if self.state == PlaybackState::Playing && length > 0 && now >= length as f64 {
            self.clock.pause();
            self.clock.seek(length as f64);
            self.state = PlaybackState::Ended;
            now = length as f64;
        }

        let tolerance = self.frame_ms() / 2.0;
        let mut latest = None;
        loop {
            let frame = match self.pending.take() {
                Some(frame) => frame,
                None => match self.source.as_mut().and_then(|s| s.try_recv()) {
                    Some(frame) => frame,
                    None => break,
                },
            };

            if self.need_frame || frame.pts_ms as f64 <= now + tolerance {
                self.need_frame = false;
                latest = Some(frame);
            } else {
                self.pending = Some(frame);
                break;
            }
        }

        latest
    }
}
