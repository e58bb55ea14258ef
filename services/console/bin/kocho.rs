//! Main Entrypoint for the Kocho Console
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and the command line.
//! 2. Initializing logging (to stderr; stdout belongs to the conversation).
//! 3. Creating the content directories and resolving the selected persona.
//! 4. Wiring the session controller or caption scheduler to the terminal.
//! 5. Stopping cleanly on `Ctrl+C`.

use anyhow::Context;
use clap::Parser;
use kocho_console::{
    app::{self, Catalogue, STOP_GRACE},
    cli::{Cli, Command},
    config::Config,
    console::{ConsoleCapture, ConsoleSpeaker, stdin_lines},
    player::SimulatedPlayer,
    presenter::TerminalPresenter,
};
use kocho_core::{
    caption::CaptionScheduler, channel::update_channel, llm_client::OpenAICompatibleClient,
    pump::PresentationPump, session::SessionController,
};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Resolves on `Ctrl+C`. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Stopping...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.personas {
        config.personas_path = dir;
    }
    if let Some(dir) = cli.scripts {
        config.scripts_path = dir;
    }
    if let Some(dir) = cli.videos {
        config.videos_path = dir;
    }

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!("Configuration loaded.");

    // --- 3. Content Directories ---
    let catalogue = Catalogue::from_config(&config);
    catalogue
        .ensure_dirs()
        .context("Failed to create content directories")?;

    // --- 4. Dispatch ---
    match cli.command {
        Command::List { json } => list(&catalogue, json),
        Command::Chat {
            persona,
            speech_pace_ms,
        } => chat(&config, &catalogue, &persona, speech_pace_ms).await,
        Command::Demo { persona, duration } => {
            demo(&config, &catalogue, &persona, Duration::from_secs(duration)).await
        }
    }
}

fn list(catalogue: &Catalogue, json: bool) -> anyhow::Result<()> {
    let listings = catalogue
        .listings()
        .context("Failed to read the persona directory")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if listings.is_empty() {
        println!(
            "No personas found in {}.",
            catalogue.personas().root().display()
        );
    }
    for listing in &listings {
        let marker = if listing.has_video { " [video]" } else { "" };
        println!("{}{marker}", listing.name);
        for line in app::render_summary(&listing.summary).lines() {
            println!("    {line}");
        }
    }
    Ok(())
}

async fn chat(
    config: &Config,
    catalogue: &Catalogue,
    persona: &str,
    speech_pace_ms: u64,
) -> anyhow::Result<()> {
    let selection = catalogue.select(persona);
    let summary = match &selection.mode {
        app::SelectionMode::Summary(summary) => summary,
        app::SelectionMode::Video(_) => anyhow::bail!(
            "Persona '{persona}' has a video demonstration; use `kocho demo {persona}` instead"
        ),
    };

    let dialogue = OpenAICompatibleClient::new(
        config
            .dialogue_config()
            .context("Dialogue provider is not configured")?,
        config.chat_model.clone(),
    );
    info!(provider = ?config.provider, model = %dialogue.model(), "Dialogue client ready");

    let (updates, receiver) = update_channel();
    let controller = SessionController::new(
        Arc::new(ConsoleCapture::new(stdin_lines())),
        Arc::new(dialogue),
        Arc::new(ConsoleSpeaker::stdout(Duration::from_millis(speech_pace_ms))),
        catalogue.personas().clone(),
        updates,
    );

    let mut pump = PresentationPump::with_interval(
        receiver,
        TerminalPresenter::stdout(),
        config.poll_interval,
    );
    pump.set_script_active(!selection.script.is_empty());
    pump.presenter_mut().show(&app::render_summary(summary));
    pump.presenter_mut()
        .show("Type a line to speak it, an empty line for silence; Ctrl+C ends the session.");

    app::run_chat(&controller, &mut pump, persona, shutdown_signal(), STOP_GRACE).await
}

async fn demo(
    config: &Config,
    catalogue: &Catalogue,
    persona: &str,
    duration: Duration,
) -> anyhow::Result<()> {
    let (_updates, receiver) = update_channel();
    let mut pump = PresentationPump::with_interval(
        receiver,
        TerminalPresenter::stdout(),
        config.poll_interval,
    );
    let mut scheduler =
        CaptionScheduler::new(SimulatedPlayer::new(duration), config.caption_interval);

    app::apply_selection(catalogue.select(persona), &mut scheduler, &mut pump)?;
    if !scheduler.script_active() {
        warn!(%persona, "No caption script; the video will play without captions");
    }
    pump.presenter_mut().show("Commands: play, pause, stop, quit.");

    app::run_demo(&mut scheduler, &mut pump, stdin_lines(), shutdown_signal()).await;
    Ok(())
}
