//! Terminal stand-ins for the speech collaborators.
//!
//! Typed lines play the part of recognized speech, and the spoken reply is
//! printed instead of played.

use async_trait::async_trait;
use kocho_core::provider::{Capture, ProviderError, SpeechCapture, SpeechSynthesis};
use std::{
    io::{self, BufRead, Write},
    sync::Mutex,
    time::Duration,
};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::debug;

/// Streams stdin line by line onto a channel.
///
/// The reader is a detached OS thread, so a blocked read never holds up
/// runtime shutdown.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
        debug!("stdin closed");
    });
    rx
}

/// Treats each typed line as one utterance. A blank line is an empty capture.
pub struct ConsoleCapture {
    lines: AsyncMutex<mpsc::UnboundedReceiver<String>>,
}

impl ConsoleCapture {
    pub fn new(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            lines: AsyncMutex::new(lines),
        }
    }
}

#[async_trait]
impl SpeechCapture for ConsoleCapture {
    async fn capture_once(&self) -> Result<Capture, ProviderError> {
        let mut lines = self.lines.lock().await;
        match lines.recv().await {
            Some(line) if line.trim().is_empty() => Ok(Capture::Empty),
            Some(line) => Ok(Capture::Utterance(line.trim().to_string())),
            // Input is exhausted; wait for the session to be stopped.
            None => std::future::pending().await,
        }
    }
}

/// Prints whatever would have been spoken.
///
/// An optional per-word pace makes "playback" take time, so a stop request can
/// land while the bot is still talking.
pub struct ConsoleSpeaker<W> {
    out: Mutex<W>,
    pace: Duration,
}

impl ConsoleSpeaker<io::Stdout> {
    pub fn stdout(pace: Duration) -> Self {
        Self::new(io::stdout(), pace)
    }
}

impl<W: Write + Send> ConsoleSpeaker<W> {
    pub fn new(out: W, pace: Duration) -> Self {
        Self {
            out: Mutex::new(out),
            pace,
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn print(&self, text: &str) -> io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("speaker output poisoned"))?;
        writeln!(out, "  (speaking) {text}")?;
        out.flush()
    }
}

#[async_trait]
impl<W: Write + Send> SpeechSynthesis for ConsoleSpeaker<W> {
    async fn speak(&self, text: &str) -> Result<(), ProviderError> {
        self.print(text)
            .map_err(|e| ProviderError::Playback(e.to_string()))?;
        if !self.pace.is_zero() {
            let words = text.split_whitespace().count() as u32;
            tokio::time::sleep(self.pace * words).await;
        }
        Ok(())
    }
}
