//! Command-line interface for the `kocho` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Talk to AI personas, or watch their captioned demonstrations.
#[derive(Parser, Debug)]
#[command(name = "kocho", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Persona directory (overrides PERSONAS_PATH)
    #[arg(long, global = true, value_name = "DIR")]
    pub personas: Option<PathBuf>,

    /// Caption script directory (overrides SCRIPTS_PATH)
    #[arg(long, global = true, value_name = "DIR")]
    pub scripts: Option<PathBuf>,

    /// Video directory (overrides VIDEOS_PATH)
    #[arg(long, global = true, value_name = "DIR")]
    pub videos: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List the available personas with their summaries
    List {
        /// Print the catalogue as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hold a conversation with a persona; each typed line is one utterance
    Chat {
        persona: String,

        /// Simulated speaking time per word, in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 0)]
        speech_pace_ms: u64,
    },

    /// Play the captioned demonstration of a persona; reads play/pause/stop/quit from stdin
    Demo {
        persona: String,

        /// Length of the simulated video, in seconds
        #[arg(long, value_name = "SECS", default_value_t = 60)]
        duration: u64,
    },
}
