//! A media player without a screen: it tracks position against the monotonic
//! clock and reports `Stopped` once the video has run its length.

use kocho_core::caption::{MediaPlayer, PlaybackState};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct SimulatedPlayer {
    media: Option<PathBuf>,
    duration: Duration,
    /// Position accumulated before the current run.
    played: Duration,
    started: Option<Instant>,
    paused: bool,
}

impl SimulatedPlayer {
    pub fn new(duration: Duration) -> Self {
        Self {
            media: None,
            duration,
            played: Duration::ZERO,
            started: None,
            paused: false,
        }
    }

    /// Loads a video, stopping whatever was loaded before.
    pub fn load(&mut self, path: impl Into<PathBuf>) {
        self.stop();
        let path = path.into();
        debug!(path = %path.display(), "Media loaded");
        self.media = Some(path);
    }

    pub fn media(&self) -> Option<&Path> {
        self.media.as_deref()
    }

    pub fn position(&self) -> Duration {
        let running = self.started.map(|t| t.elapsed()).unwrap_or_default();
        (self.played + running).min(self.duration)
    }
}

impl MediaPlayer for SimulatedPlayer {
    fn state(&self) -> PlaybackState {
        if self.started.is_some() {
            if self.position() >= self.duration {
                PlaybackState::Stopped
            } else {
                PlaybackState::Playing
            }
        } else if self.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Stopped
        }
    }

    fn has_media(&self) -> bool {
        self.media.is_some()
    }

    fn play(&mut self) {
        if !self.has_media() {
            return;
        }
        match self.state() {
            PlaybackState::Playing => {}
            PlaybackState::Paused => {
                self.paused = false;
                self.started = Some(Instant::now());
            }
            PlaybackState::Stopped => {
                self.played = Duration::ZERO;
                self.paused = false;
                self.started = Some(Instant::now());
            }
        }
    }

    fn pause(&mut self) {
        if self.state() == PlaybackState::Playing {
            self.played = self.position();
            self.started = None;
            self.paused = true;
        }
    }

    fn stop(&mut self) {
        self.played = Duration::ZERO;
        self.started = None;
        self.paused = false;
    }
}
