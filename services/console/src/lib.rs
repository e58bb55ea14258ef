//! Kocho Console Library Crate
//!
//! Everything the `kocho` binary needs around the core: configuration,
//! terminal stand-ins for speech capture and synthesis, the simulated media
//! player, the terminal presenter and the chat/demo loops. The binary in
//! `bin/kocho.rs` is a thin wrapper around this library.

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod player;
pub mod presenter;
