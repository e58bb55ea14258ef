//! External Collaborator Contracts
//!
//! Speech capture, the dialogue engine and speech synthesis are all outbound
//! calls to third parties. The session controller only ever sees them through
//! these traits, which keeps the turn-taking logic testable without audio
//! hardware or network access.

use async_trait::async_trait;

/// Canned assistant turn that completes the persona priming exchange.
pub const PRIMING_ACKNOWLEDGEMENT: &str = "Understood. I will now respond as this persona.";

/// Failure of an external provider call. Always recoverable at the call site.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("quota exhausted: {0}")]
    Quota(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
    #[error("{0}")]
    Other(String),
}

/// Result of a single capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// Recognized speech.
    Utterance(String),
    /// Nothing was heard, or it could not be understood.
    Empty,
}

impl Capture {
    /// The recognized text, if it contains anything but whitespace.
    pub fn text(&self) -> Option<&str> {
        match self {
            Capture::Utterance(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Conversation state held on behalf of the dialogue engine.
///
/// The first two turns are always the priming exchange: the persona prompt as
/// a user turn followed by [`PRIMING_ACKNOWLEDGEMENT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueHandle {
    history: Vec<Turn>,
}

impl DialogueHandle {
    pub fn primed(persona_prompt: &str) -> Self {
        Self {
            history: vec![
                Turn::user(persona_prompt),
                Turn::assistant(PRIMING_ACKNOWLEDGEMENT),
            ],
        }
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Appends a completed user/assistant exchange.
    pub fn record_exchange(&mut self, user: &str, reply: &str) {
        self.history.push(Turn::user(user));
        self.history.push(Turn::assistant(reply));
    }
}

/// Single-shot utterance capture. Blocks (asynchronously) until speech ends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    async fn capture_once(&self) -> Result<Capture, ProviderError>;
}

/// A stateful chat engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DialogueProvider: Send + Sync {
    /// Opens a conversation primed with the persona prompt.
    async fn open(&self, persona_prompt: &str) -> Result<DialogueHandle, ProviderError>;

    /// Sends one user utterance and returns the reply. On success the
    /// exchange is recorded on the handle; on failure the handle is unchanged.
    async fn send(&self, handle: &mut DialogueHandle, text: &str) -> Result<String, ProviderError>;
}

/// Text-to-speech with playback. Returns once the audio has finished playing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), ProviderError>;
}
