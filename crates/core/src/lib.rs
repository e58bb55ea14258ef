//! Kocho Conversational Core
//!
//! Session orchestration for a voice-driven persona chat: the conversation
//! state machine and its worker loop, the update channel that carries the
//! worker's progress to the presentation layer, the pump that drains it, and
//! the caption scheduler that narrates a video from a script.
//!
//! Speech capture, the dialogue engine and speech synthesis are external
//! collaborators reached through the traits in [`provider`].

pub mod caption;
pub mod channel;
pub mod llm_client;
pub mod persona;
pub mod provider;
pub mod pump;
pub mod script;
pub mod session;
