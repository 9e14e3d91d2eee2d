use std::path::Path;

use tracing::{info, warn};
use vlc::{Instance, Media, MediaPlayer, State};

use crate::{MediaBackend, MediaInfo, PlaybackState, PlayerError, VideoFrame};

/// libvlc playback. Video is rendered by libvlc itself, so
/// [`MediaBackend::poll_frame`] never yields frames.
pub struct VlcBackend {
    instance: Instance,
    player: MediaPlayer,
    media: Option<Media>,
    rate: f32,
}

impl VlcBackend {
    pub fn new() -> Result<Self, PlayerError> {
        let instance = Instance::new()
            .ok_or_else(|| PlayerError::Backend("libvlc instance could not be created".to_string()))?;
        let player = MediaPlayer::new(&instance)
            .ok_or_else(|| PlayerError::Backend("libvlc media player could not be created".to_string()))?;
        Ok(Self {
            instance,
            player,
            media: None,
            rate: 1.0,
        })
    }
}

impl MediaBackend for VlcBackend {
    fn open(&mut self, path: &Path) -> Result<MediaInfo, PlayerError> {
        if !path.exists() {
            return Err(PlayerError::NotFound(path.to_path_buf()));
        }
        let media = Media::new_path(&self.instance, path).ok_or_else(|| PlayerError::Unsupported {
            path: path.to_path_buf(),
            reason: "libvlc rejected the file".to_string(),
        })?;
        media.parse();

        self.player.set_media(&media);
        let duration_ms = media.duration().unwrap_or(0);
        self.media = Some(media);
        if self.player.set_rate(self.rate).is_err() {
            warn!("libvlc rejected playback rate {}", self.rate);
        }
        info!("libvlc opened {} ({} ms)", path.display(), duration_ms);

        Ok(MediaInfo {
            path: path.to_path_buf(),
            width: 0,
            height: 0,
            fps: 0.0,
            duration_ms,
        })
    }

    fn close(&mut self) {
        self.player.stop();
        self.media = None;
    }

    fn play(&mut self) {
        if self.media.is_none() {
            return;
        }
        if self.player.state() == State::Ended {
            self.player.stop();
        }
        if self.player.play().is_err() {
            warn!("libvlc refused to start playback");
        }
    }

    fn pause(&mut self) {
        self.player.set_pause(true);
    }

    fn stop(&mut self) {
        self.player.stop();
    }

    fn set_time(&mut self, ms: i64) {
        let length = self.length();
        let ms = if length > 0 { ms.clamp(0, length) } else { ms.max(0) };
        self.player.set_time(ms);
    }

    fn time(&self) -> i64 {
        self.player.get_time().unwrap_or(0).max(0)
    }

    fn length(&self) -> i64 {
        self.media
            .as_ref()
            .and_then(|m| m.duration())
            .unwrap_or(0)
            .max(0)
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        if self.player.set_rate(rate).is_err() {
            warn!("libvlc rejected playback rate {}", rate);
        }
    }

    fn rate(&self) -> f32 {
        self.rate
    }

    fn state(&self) -> PlaybackState {
        if self.media.is_none() {
            return PlaybackState::Idle;
        }
        match self.player.state() {
            State::Playing | State::Opening | State::Buffering => PlaybackState::Playing,
            State::Paused => PlaybackState::Paused,
            State::Ended => PlaybackState::Ended,
            State::Error => PlaybackState::Error("libvlc playback error".to_string()),
            State::NothingSpecial | State::Stopped => PlaybackState::Stopped,
        }
    }

    fn poll_frame(&mut self) -> Option<VideoFrame> {
        None
    }

    fn renders_externally(&self) -> bool {
        true
    }
}
