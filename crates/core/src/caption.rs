//! Caption Scheduler
//!
//! Reveals a caption script one line at a time while a bound video plays.
//! Reveals are driven by a single owned timer slot: pausing or stopping the
//! player drops the pending timer, so at most one reveal is ever outstanding.

use crate::{pump::Presenter, script::CaptionScript};
use std::{pin::Pin, time::Duration};
use tokio::time::Sleep;
use tracing::debug;

/// Default delay between two caption lines.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

/// The playback signal exposed by a media player.
pub trait MediaPlayer {
    fn state(&self) -> PlaybackState;

    fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Whether a video is loaded at all.
    fn has_media(&self) -> bool;

    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
}

pub struct CaptionScheduler<P> {
    player: P,
    script: CaptionScript,
    cursor: usize,
    interval: Duration,
    pending: Option<Pin<Box<Sleep>>>,
}

impl<P: MediaPlayer> CaptionScheduler<P> {
    pub fn new(player: P, interval: Duration) -> Self {
        Self {
            player,
            script: CaptionScript::default(),
            cursor: 0,
            interval,
            pending: None,
        }
    }

    /// Binds a freshly loaded script: cancels any pending reveal, rewinds the
    /// cursor and clears the visible log.
    pub fn bind_script(&mut self, script: CaptionScript, view: &mut dyn Presenter) {
        self.cancel_pending();
        self.script = script;
        self.cursor = 0;
        view.clear_log();
    }

    /// True while a non-empty script is bound.
    pub fn script_active(&self) -> bool {
        !self.script.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Starts or resumes playback.
    ///
    /// Resuming from pause continues at the current line. Any other start is a
    /// new run: the cursor rewinds and the log is cleared before the first
    /// reveal.
    pub fn play(&mut self, view: &mut dyn Presenter) {
        if !self.player.has_media() || self.player.is_playing() {
            return;
        }
        if self.player.state() != PlaybackState::Paused {
            self.stop(view);
            self.cursor = 0;
            view.clear_log();
        }
        self.player.play();
        view.set_status("Playing video demo...");
        self.start_reveal(view);
    }

    pub fn pause(&mut self, view: &mut dyn Presenter) {
        if self.player.is_playing() {
            self.player.pause();
            self.cancel_pending();
            view.set_status("Video paused.");
        }
    }

    pub fn stop(&mut self, view: &mut dyn Presenter) {
        if matches!(
            self.player.state(),
            PlaybackState::Playing | PlaybackState::Paused
        ) {
            self.player.stop();
            self.cancel_pending();
            view.set_status("Video stopped.");
        }
    }

    /// Reveals the line at the cursor and schedules the next one.
    ///
    /// Stops silently once the script is exhausted or the player is no longer
    /// playing.
    pub fn start_reveal(&mut self, view: &mut dyn Presenter) {
        self.cancel_pending();
        if !self.player.is_playing() {
            return;
        }
        let Some(line) = self.script.line(self.cursor) else {
            return;
        };

        view.append_log(line);
        self.cursor += 1;
        debug!(cursor = self.cursor, total = self.script.len(), "Caption revealed");

        if self.cursor < self.script.len() {
            self.pending = Some(Box::pin(tokio::time::sleep(self.interval)));
        }
    }

    /// Resolves when the pending reveal is due; never resolves if none is.
    ///
    /// Cancel-safe: dropping the future leaves the pending timer in place.
    pub async fn reveal_due(&mut self) {
        match self.pending.as_mut() {
            Some(timer) => {
                timer.as_mut().await;
                self.pending = None;
            }
            None => std::future::pending().await,
        }
    }

    fn cancel_pending(&mut self) {
        if self.pending.take().is_some() {
            debug!("Pending caption reveal cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::recording::RecordingPresenter;
    use tokio::time::{Instant, timeout};

    #[derive(Debug)]
    struct FakePlayer {
        state: PlaybackState,
        media: bool,
    }

    impl Default for FakePlayer {
        fn default() -> Self {
            Self {
                state: PlaybackState::Stopped,
                media: true,
            }
        }
    }

    impl MediaPlayer for FakePlayer {
        fn state(&self) -> PlaybackState {
            self.state
        }
        fn has_media(&self) -> bool {
            self.media
        }
        fn play(&mut self) {
            self.state = PlaybackState::Playing;
        }
        fn pause(&mut self) {
            self.state = PlaybackState::Paused;
        }
        fn stop(&mut self) {
            self.state = PlaybackState::Stopped;
        }
    }

    const INTERVAL: Duration = Duration::from_millis(4000);

    fn scheduler_with(lines: &[&str]) -> (CaptionScheduler<FakePlayer>, RecordingPresenter) {
        let mut view = RecordingPresenter::default();
        let mut scheduler = CaptionScheduler::new(FakePlayer::default(), INTERVAL);
        scheduler.bind_script(lines.iter().copied().collect(), &mut view);
        (scheduler, view)
    }

    async fn fire(scheduler: &mut CaptionScheduler<FakePlayer>, view: &mut RecordingPresenter) {
        scheduler.reveal_due().await;
        scheduler.start_reveal(view);
    }

    async fn assert_nothing_fires(scheduler: &mut CaptionScheduler<FakePlayer>) {
        assert!(
            timeout(INTERVAL * 3, scheduler.reveal_due()).await.is_err(),
            "a reveal fired unexpectedly"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_lines_reveal_on_schedule() {
        let (mut scheduler, mut view) = scheduler_with(&["one", "two", "three"]);
        let start = Instant::now();

        scheduler.play(&mut view);
        assert_eq!(view.log, ["one"]);
        assert_eq!(view.status(), Some("Playing video demo..."));

        fire(&mut scheduler, &mut view).await;
        assert_eq!(start.elapsed(), INTERVAL);
        assert_eq!(view.log, ["one", "two"]);

        fire(&mut scheduler, &mut view).await;
        assert_eq!(start.elapsed(), INTERVAL * 2);
        assert_eq!(view.log, ["one", "two", "three"]);

        assert!(!scheduler.has_pending());
        assert_eq!(scheduler.cursor(), 3);
        assert_nothing_fires(&mut scheduler).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_pending_reveal() {
        let (mut scheduler, mut view) = scheduler_with(&["a", "b", "c", "d", "e"]);

        scheduler.play(&mut view);
        fire(&mut scheduler, &mut view).await;
        fire(&mut scheduler, &mut view).await;
        assert_eq!(view.log, ["a", "b", "c"]);
        assert!(scheduler.has_pending());

        scheduler.pause(&mut view);
        assert_eq!(view.status(), Some("Video paused."));
        assert!(!scheduler.has_pending());
        assert_nothing_fires(&mut scheduler).await;
        assert_eq!(view.log, ["a", "b", "c"]);

        let clears_before = view.clears;
        scheduler.play(&mut view);
        assert_eq!(view.log, ["a", "b", "c", "d"]);
        assert_eq!(view.clears, clears_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_from_stop_rewinds_and_clears() {
        let (mut scheduler, mut view) = scheduler_with(&["a", "b", "c"]);

        scheduler.play(&mut view);
        fire(&mut scheduler, &mut view).await;
        assert_eq!(view.log, ["a", "b"]);

        scheduler.stop(&mut view);
        assert_eq!(view.status(), Some("Video stopped."));
        assert!(!scheduler.has_pending());
        assert_nothing_fires(&mut scheduler).await;

        let clears_before = view.clears;
        scheduler.play(&mut view);
        assert_eq!(view.clears, clears_before + 1);
        assert_eq!(view.log, ["a"]);
        assert_eq!(scheduler.cursor(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_stops_when_player_ends_on_its_own() {
        let (mut scheduler, mut view) = scheduler_with(&["a", "b", "c"]);

        scheduler.play(&mut view);
        scheduler.player_mut().stop();
        fire(&mut scheduler, &mut view).await;

        assert_eq!(view.log, ["a"]);
        assert!(!scheduler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_reveal_never_leaves_two_pending() {
        let (mut scheduler, mut view) = scheduler_with(&["a", "b", "c", "d"]);
        let start = Instant::now();

        scheduler.play(&mut view);
        tokio::time::advance(Duration::from_millis(1000)).await;
        scheduler.start_reveal(&mut view);
        assert_eq!(view.log, ["a", "b"]);

        fire(&mut scheduler, &mut view).await;
        assert_eq!(start.elapsed(), Duration::from_millis(5000));
        assert_eq!(view.log, ["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_script_reveals_nothing() {
        let (mut scheduler, mut view) = scheduler_with(&[]);
        assert!(!scheduler.script_active());

        scheduler.play(&mut view);
        assert!(view.log.is_empty());
        assert!(!scheduler.has_pending());
        assert!(scheduler.player().is_playing());
    }

    #[test]
    fn test_play_without_media_is_ignored() {
        let mut view = RecordingPresenter::default();
        let mut scheduler = CaptionScheduler::new(
            FakePlayer {
                media: false,
                ..Default::default()
            },
            INTERVAL,
        );
        scheduler.play(&mut view);
        assert_eq!(scheduler.player().state(), PlaybackState::Stopped);
        assert!(view.statuses.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebinding_script_cancels_and_rewinds() {
        let (mut scheduler, mut view) = scheduler_with(&["a", "b"]);
        scheduler.play(&mut view);
        assert!(scheduler.has_pending());

        scheduler.bind_script(["x", "y", "z"].into_iter().collect(), &mut view);
        assert!(!scheduler.has_pending());
        assert_eq!(scheduler.cursor(), 0);
        assert!(view.log.is_empty());
        assert!(scheduler.script_active());
    }
}
