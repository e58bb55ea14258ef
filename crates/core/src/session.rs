//! Conversation Session Controller
//!
//! This module owns the turn-taking loop: capture an utterance, check it for an
//! exit phrase, exchange it with the dialogue engine, speak the reply, repeat.
//!
//! The loop runs on its own Tokio task. It never touches presentation state;
//! every observable step is pushed onto the [`UpdateSender`]. The only other
//! value shared with the presentation side is the atomic live-session marker
//! that `stop_session` clears.

use crate::{
    channel::{UpdateMessage, UpdateSender},
    persona::{Persona, PersonaStore},
    provider::{DialogueHandle, DialogueProvider, SpeechCapture, SpeechSynthesis},
};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};

/// Phrases that end the conversation when heard anywhere in an utterance.
pub const EXIT_PHRASES: [&str; 4] = ["goodbye", "exit", "stop", "that's all"];
/// Spoken when an exit phrase is heard.
pub const FAREWELL: &str = "Goodbye!";
/// Spoken in place of a reply when the dialogue engine fails.
pub const APOLOGY: &str = "Sorry, I'm having trouble thinking right now.";

/// Case-insensitive substring match against [`EXIT_PHRASES`].
///
/// Deliberately permissive: "please just STOP now" ends the session.
pub fn is_exit_phrase(utterance: &str) -> bool {
    let lowered = utterance.to_lowercase();
    EXIT_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    Thinking,
    Speaking,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Listening => write!(f, "listening"),
            SessionState::Thinking => write!(f, "thinking"),
            SessionState::Speaking => write!(f, "speaking"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// `start_session` finished initializing.
    Start,
    /// A non-empty utterance that is not an exit phrase.
    Heard,
    /// Nothing intelligible was captured.
    Unheard,
    /// The utterance contained an exit phrase.
    ExitPhrase,
    /// The dialogue engine produced a reply (or the apology stood in for one).
    Replied,
    /// Synthesis and playback finished, successfully or not.
    Spoken,
    /// The session was stopped.
    Stop,
}

impl SessionState {
    /// Applies one event to the state machine.
    pub fn on(self, event: SessionEvent) -> Result<SessionState, SessionError> {
        use SessionEvent as E;
        use SessionState as S;
        match (self, event) {
            (S::Idle | S::Stopped, E::Start) => Ok(S::Listening),
            (S::Listening, E::Heard) => Ok(S::Thinking),
            (S::Listening, E::Unheard) => Ok(S::Listening),
            (S::Listening, E::ExitPhrase) => Ok(S::Speaking),
            (S::Thinking, E::Replied) => Ok(S::Speaking),
            (S::Speaking, E::Spoken) => Ok(S::Listening),
            (_, E::Stop) => Ok(S::Stopped),
            (from, event) => Err(SessionError::InvalidTransition { from, event }),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("A session is already running.")]
    AlreadyRunning,
    #[error("Invalid session transition from {from} on {event:?}")]
    InvalidTransition {
        from: SessionState,
        event: SessionEvent,
    },
}

/// The single live conversation, owned by the worker task.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    persona_name: String,
    dialogue: DialogueHandle,
}

impl Session {
    pub fn new(persona_name: impl Into<String>, dialogue: DialogueHandle) -> Self {
        Self {
            state: SessionState::Idle,
            persona_name: persona_name.into(),
            dialogue,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn persona_name(&self) -> &str {
        &self.persona_name
    }

    pub fn advance(&mut self, event: SessionEvent) -> Result<SessionState, SessionError> {
        self.state = self.state.on(event)?;
        Ok(self.state)
    }
}

/// Identifies the live session, if any. `0` means none.
///
/// Every `start_session` gets a fresh id, so a worker that is still unwinding
/// from a previous session can never mistake a newer session for its own.
#[derive(Debug, Default)]
struct LiveSession {
    active: AtomicU64,
    issued: AtomicU64,
}

impl LiveSession {
    fn begin(&self) -> Option<u64> {
        let id = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.active
            .compare_exchange(0, id, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| id)
    }

    fn is_live(&self, id: u64) -> bool {
        self.active.load(Ordering::SeqCst) == id
    }

    fn any_live(&self) -> bool {
        self.active.load(Ordering::SeqCst) != 0
    }

    fn end_current(&self) -> bool {
        self.active.swap(0, Ordering::SeqCst) != 0
    }

    fn end(&self, id: u64) -> bool {
        self.active
            .compare_exchange(id, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Starts, runs and stops conversation sessions.
///
/// Cloning is cheap; clones share the providers, the update channel and the
/// live-session marker.
#[derive(Clone)]
pub struct SessionController {
    capture: Arc<dyn SpeechCapture>,
    dialogue: Arc<dyn DialogueProvider>,
    synthesis: Arc<dyn SpeechSynthesis>,
    personas: PersonaStore,
    updates: UpdateSender,
    live: Arc<LiveSession>,
}

impl SessionController {
    pub fn new(
        capture: Arc<dyn SpeechCapture>,
        dialogue: Arc<dyn DialogueProvider>,
        synthesis: Arc<dyn SpeechSynthesis>,
        personas: PersonaStore,
        updates: UpdateSender,
    ) -> Self {
        Self {
            capture,
            dialogue,
            synthesis,
            personas,
            updates,
            live: Arc::new(LiveSession::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.live.any_live()
    }

    /// Spawns the conversation worker for `persona_name`.
    ///
    /// Rejected with [`SessionError::AlreadyRunning`] while another session is
    /// live. Must be called from within a Tokio runtime.
    pub fn start_session(&self, persona_name: &str) -> Result<JoinHandle<()>, SessionError> {
        let Some(id) = self.live.begin() else {
            warn!(persona = %persona_name, "Refusing to start a second session");
            return Err(SessionError::AlreadyRunning);
        };

        // Emitted before spawning, so it always precedes a later stop.
        self.updates.status("Initializing...");

        let worker = self.clone();
        let span = info_span!("session", session = id, persona = %persona_name);
        Ok(tokio::spawn(
            worker.run(id, persona_name.to_string()).instrument(span),
        ))
    }

    /// Ends the live session. A no-op when nothing is running.
    ///
    /// Does not wait for the worker: a reply already being spoken finishes
    /// first, and the worker exits at its next check point.
    pub fn stop_session(&self) {
        if self.live.end_current() {
            self.announce_stopped();
        }
    }

    fn finish(&self, id: u64) {
        if self.live.end(id) {
            self.announce_stopped();
        }
    }

    fn announce_stopped(&self) {
        info!("Session stopped");
        self.updates
            .status("Session ended. Select a persona and start a new session.");
        self.updates.send(UpdateMessage::SessionStopped);
        self.updates.log("Conversation ended.");
    }

    async fn run(self, id: u64, persona_name: String) {
        let Some(mut session) = self.initialize(id, &persona_name).await else {
            return;
        };

        if let Err(e) = self.converse(id, &mut session).await {
            error!(error = %e, "Conversation loop aborted");
            self.finish(id);
        }
        info!(state = %session.state(), "Session worker finished");
    }

    async fn initialize(&self, id: u64, persona_name: &str) -> Option<Session> {
        let (persona, note) = match self.personas.load(persona_name) {
            Ok(persona) => {
                let path = self.personas.path_for(persona_name);
                let file = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();
                let note = format!("Persona loaded from {file}.");
                (persona, note)
            }
            Err(e) => {
                warn!(error = %e, "Using fallback persona");
                (Persona::fallback(persona_name), format!("Warning: {e}"))
            }
        };

        if !self.live.is_live(id) {
            info!("Session stopped before initialization finished");
            return None;
        }
        self.updates.log(note);

        let handle = match self.dialogue.open(&persona.prompt).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Could not open a dialogue");
                if self.live.is_live(id) {
                    self.updates
                        .log(format!("Could not start a conversation: {e}"));
                }
                self.finish(id);
                return None;
            }
        };

        if !self.live.is_live(id) {
            info!("Session stopped during initialization");
            return None;
        }

        let mut session = Session::new(persona.name, handle);
        if let Err(e) = session.advance(SessionEvent::Start) {
            error!(error = %e, "Session could not enter the listening state");
            self.finish(id);
            return None;
        }
        self.updates.status(format!(
            "Ready to chat as {}. Say something!",
            session.persona_name()
        ));
        self.updates.send(UpdateMessage::SessionStarted);
        info!("Session started");
        Some(session)
    }

    async fn converse(&self, id: u64, session: &mut Session) -> Result<(), SessionError> {
        while self.live.is_live(id) {
            self.updates.status("Listening...");
            let captured = self.capture.capture_once().await;

            if !self.live.is_live(id) {
                break;
            }

            let text = match captured {
                Ok(capture) => match capture.text() {
                    Some(text) => text.to_string(),
                    None => {
                        session.advance(SessionEvent::Unheard)?;
                        self.updates.log("Understood nothing.");
                        self.updates.status("Couldn't hear you. Try again.");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Speech capture failed");
                    session.advance(SessionEvent::Unheard)?;
                    self.updates.log(format!("Speech recognition canceled: {e}"));
                    self.updates.status("Speech recognition canceled.");
                    continue;
                }
            };

            self.updates.log(format!("You: {text}"));

            if is_exit_phrase(&text) {
                info!("Exit phrase heard");
                session.advance(SessionEvent::ExitPhrase)?;
                self.speak(id, FAREWELL).await;
                self.finish(id);
                session.advance(SessionEvent::Stop)?;
                break;
            }

            session.advance(SessionEvent::Heard)?;
            let reply = self.reply_to(session, &text).await;
            session.advance(SessionEvent::Replied)?;
            self.speak(id, &reply).await;
            session.advance(SessionEvent::Spoken)?;
        }

        if session.state() != SessionState::Stopped {
            session.advance(SessionEvent::Stop)?;
        }
        Ok(())
    }

    async fn reply_to(&self, session: &mut Session, text: &str) -> String {
        self.updates.status("Thinking...");
        match self.dialogue.send(&mut session.dialogue, text).await {
            Ok(reply) => {
                self.updates.log(format!("Bot: {reply}"));
                reply
            }
            Err(e) => {
                error!(error = %e, "Dialogue provider failed");
                self.updates
                    .log(format!("An error occurred with the dialogue provider: {e}"));
                APOLOGY.to_string()
            }
        }
    }

    async fn speak(&self, id: u64, text: &str) {
        if text.is_empty() || !self.live.is_live(id) {
            return;
        }
        self.updates.status("Speaking...");
        if let Err(e) = self.synthesis.speak(text).await {
            warn!(error = %e, "Speech synthesis failed");
            self.updates
                .log(format!("An error occurred during audio playback: {e}"));
        }
    }
}
