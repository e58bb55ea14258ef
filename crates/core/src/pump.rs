//! Presentation Pump
//!
//! Runs on the rendering context only. On every tick it drains whatever the
//! session worker has queued and hands each message to the [`Presenter`].

use crate::channel::{UpdateMessage, UpdateReceiver};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::trace;

/// Default polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Observer callbacks for the visible surfaces: log, status line, session
/// controls.
pub trait Presenter {
    fn append_log(&mut self, line: &str);
    fn clear_log(&mut self);
    fn set_status(&mut self, status: &str);
    fn session_started(&mut self);
    fn session_stopped(&mut self);
}

pub struct PresentationPump<P> {
    updates: UpdateReceiver,
    presenter: P,
    interval: Duration,
    script_active: bool,
}

impl<P: Presenter> PresentationPump<P> {
    pub fn new(updates: UpdateReceiver, presenter: P) -> Self {
        Self::with_interval(updates, presenter, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(updates: UpdateReceiver, presenter: P, interval: Duration) -> Self {
        Self {
            updates,
            presenter,
            interval,
            script_active: false,
        }
    }

    /// A timer firing at the pump's cadence. Late ticks are not bunched up.
    pub fn ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Drains every message available right now and dispatches it.
    /// Returns how many messages were handled.
    pub fn tick(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.updates.try_receive() {
            self.dispatch(message);
            handled += 1;
        }
        if handled > 0 {
            trace!(handled, "Pump tick");
        }
        handled
    }

    pub fn dispatch(&mut self, message: UpdateMessage) {
        match message {
            UpdateMessage::Log(line) => self.log(&line),
            UpdateMessage::StatusChanged(status) => self.presenter.set_status(&status),
            UpdateMessage::SessionStarted => self.presenter.session_started(),
            UpdateMessage::SessionStopped => self.presenter.session_stopped(),
        }
    }

    /// Writes a conversation line, unless a caption script owns the log.
    pub fn log(&mut self, line: &str) {
        if !self.script_active {
            self.presenter.append_log(line);
        }
    }

    /// While set, the visible log shows the scripted narrative only.
    pub fn set_script_active(&mut self, active: bool) {
        self.script_active = active;
    }

    pub fn script_active(&self) -> bool {
        self.script_active
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }
}
