//! Worker-to-Presentation Update Channel
//!
//! The conversation worker never touches presentation state directly. Every
//! observable step is pushed onto this unbounded FIFO queue and drained by the
//! [`PresentationPump`](crate::pump::PresentationPump) on its own cadence.

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::trace;

/// A single update produced by the session worker for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateMessage {
    /// A line for the conversation log.
    Log(String),
    /// A replacement text for the status line.
    StatusChanged(String),
    /// A session has finished initializing and is listening.
    SessionStarted,
    /// The live session has ended.
    SessionStopped,
}

/// Creates a connected sender/receiver pair.
pub fn update_channel() -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UpdateSender { tx }, UpdateReceiver { rx })
}

/// Producer half. Cheap to clone; sending never blocks and never fails.
#[derive(Debug, Clone)]
pub struct UpdateSender {
    tx: mpsc::UnboundedSender<UpdateMessage>,
}

impl UpdateSender {
    /// Appends a message to the queue.
    ///
    /// If the consumer has been torn down the message is discarded.
    pub fn send(&self, message: UpdateMessage) {
        if let Err(err) = self.tx.send(message) {
            trace!(message = ?err.0, "Update consumer is gone; dropping message.");
        }
    }

    pub fn log(&self, line: impl Into<String>) {
        self.send(UpdateMessage::Log(line.into()));
    }

    pub fn status(&self, text: impl Into<String>) {
        self.send(UpdateMessage::StatusChanged(text.into()));
    }
}

/// Consumer half, owned by the presentation layer.
#[derive(Debug)]
pub struct UpdateReceiver {
    rx: mpsc::UnboundedReceiver<UpdateMessage>,
}

impl UpdateReceiver {
    /// Returns the oldest undelivered message, or `None` when the queue is
    /// currently empty. Never blocks.
    pub fn try_receive(&mut self) -> Option<UpdateMessage> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Takes every message that is available right now, oldest first.
    pub fn drain(&mut self) -> Vec<UpdateMessage> {
        std::iter::from_fn(|| self.try_receive()).collect()
    }
}
