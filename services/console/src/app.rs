//! Wiring between the core components and the terminal: persona selection,
//! the chat loop and the caption demo loop.

use crate::{config::Config, player::SimulatedPlayer, presenter::TerminalPresenter};
use anyhow::Context;
use kocho_core::{
    caption::{CaptionScheduler, MediaPlayer},
    persona::{PersonaStore, PersonaSummary},
    pump::{PresentationPump, Presenter},
    script::{CaptionScript, ScriptStore},
    session::SessionController,
};
use serde::Serialize;
use std::{
    fmt, fs, io,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How long a stopped chat worker may take to wind down before it is aborted.
pub const STOP_GRACE: Duration = Duration::from_secs(2);

const VIDEO_EXTENSION: &str = "mp4";

/// The three content directories: personas, caption scripts and videos.
#[derive(Debug, Clone)]
pub struct Catalogue {
    personas: PersonaStore,
    scripts: ScriptStore,
    videos: PathBuf,
}

/// What selecting a persona makes available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    /// A video exists: captions can be played, conversation is disabled.
    Video(PathBuf),
    /// No video: the summary is shown and a conversation may be started.
    Summary(PersonaSummary),
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub persona: String,
    pub script: CaptionScript,
    pub mode: SelectionMode,
}

impl Selection {
    pub fn can_start_session(&self) -> bool {
        matches!(self.mode, SelectionMode::Summary(_))
    }
}

/// One row of `kocho list`.
#[derive(Debug, Clone, Serialize)]
pub struct PersonaListing {
    pub name: String,
    pub has_video: bool,
    #[serde(flatten)]
    pub summary: PersonaSummary,
}

impl Catalogue {
    pub fn new(
        personas: impl Into<PathBuf>,
        scripts: impl Into<PathBuf>,
        videos: impl Into<PathBuf>,
    ) -> Self {
        Self {
            personas: PersonaStore::new(personas),
            scripts: ScriptStore::new(scripts),
            videos: videos.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.personas_path,
            &config.scripts_path,
            &config.videos_path,
        )
    }

    /// Creates any of the content directories that do not exist yet.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [self.personas.root(), self.scripts.root(), self.videos.as_path()] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn personas(&self) -> &PersonaStore {
        &self.personas
    }

    pub fn video_path(&self, persona: &str) -> PathBuf {
        self.videos.join(format!("{persona}.{VIDEO_EXTENSION}"))
    }

    pub fn listings(&self) -> io::Result<Vec<PersonaListing>> {
        Ok(self
            .personas
            .list()?
            .into_iter()
            .map(|name| PersonaListing {
                has_video: self.video_path(&name).is_file(),
                summary: self.personas.summary(&name),
                name,
            })
            .collect())
    }

    /// Resolves everything a persona selection needs.
    pub fn select(&self, persona: &str) -> Selection {
        let script = self.scripts.load(persona);
        let video = self.video_path(persona);
        let mode = if video.is_file() {
            SelectionMode::Video(video)
        } else {
            SelectionMode::Summary(self.personas.summary(persona))
        };
        let selection = Selection {
            persona: persona.to_string(),
            script,
            mode,
        };
        info!(
            %persona,
            video = !selection.can_start_session(),
            lines = selection.script.len(),
            "Persona selected"
        );
        selection
    }
}

/// Renders the summary block shown for personas without a video.
pub fn render_summary(summary: &PersonaSummary) -> String {
    format!(
        "Attacker: {}\nRole: {}\nTarget: {}\nPretext: {}\nPrimary Goal: {}",
        summary.attacker, summary.role, summary.target, summary.pretext, summary.primary_goal
    )
}

/// Applies a selection to the demo surfaces.
///
/// Any playing video is stopped, the script is bound (clearing the log), the
/// pump's script mode follows the script and the video is loaded.
pub fn apply_selection<V: Presenter>(
    selection: Selection,
    scheduler: &mut CaptionScheduler<SimulatedPlayer>,
    pump: &mut PresentationPump<V>,
) -> anyhow::Result<()> {
    scheduler.stop(pump.presenter_mut());
    scheduler.bind_script(selection.script, pump.presenter_mut());
    pump.set_script_active(scheduler.script_active());

    match selection.mode {
        SelectionMode::Video(path) => {
            scheduler.player_mut().load(path);
            Ok(())
        }
        SelectionMode::Summary(_) => anyhow::bail!(
            "Persona '{}' has no video demonstration; use `kocho chat {}` instead",
            selection.persona,
            selection.persona
        ),
    }
}

/// Runs one conversation until it ends on its own or `shutdown` resolves.
///
/// On shutdown the session is stopped and the worker gets `grace` to reach a
/// check point before it is aborted. The channel is drained once more after the
/// worker is gone.
pub async fn run_chat<V, F>(
    controller: &SessionController,
    pump: &mut PresentationPump<V>,
    persona: &str,
    shutdown: F,
    grace: Duration,
) -> anyhow::Result<()>
where
    V: Presenter,
    F: Future<Output = ()>,
{
    let mut worker = controller
        .start_session(persona)
        .context("Failed to start the session")?;
    let mut ticker = pump.ticker();
    let grace_timer = tokio::time::sleep(Duration::MAX);
    tokio::pin!(shutdown, grace_timer);
    let mut stopping = false;
    let mut aborted = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                pump.tick();
            }
            _ = &mut shutdown, if !stopping => {
                info!("Stop requested");
                controller.stop_session();
                stopping = true;
                grace_timer
                    .as_mut()
                    .reset(tokio::time::Instant::now() + grace);
            }
            _ = &mut grace_timer, if stopping && !aborted => {
                warn!("Session worker did not finish in time; aborting it");
                worker.abort();
                aborted = true;
            }
            result = &mut worker => {
                if let Err(e) = result {
                    if !e.is_cancelled() {
                        warn!(error = %e, "Session worker failed");
                    }
                }
                break;
            }
        }
    }

    pump.tick();
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoCommand {
    Play,
    Pause,
    Stop,
    Quit,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown command '{0}'. Use play, pause, stop or quit.")]
pub struct UnknownCommand(String);

impl FromStr for DemoCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "play" | "p" => Ok(DemoCommand::Play),
            "pause" => Ok(DemoCommand::Pause),
            "stop" | "s" => Ok(DemoCommand::Stop),
            "quit" | "q" | "exit" => Ok(DemoCommand::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for DemoCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoCommand::Play => write!(f, "play"),
            DemoCommand::Pause => write!(f, "pause"),
            DemoCommand::Stop => write!(f, "stop"),
            DemoCommand::Quit => write!(f, "quit"),
        }
    }
}

/// Drives caption playback from operator commands.
///
/// Returns on `quit`, on `shutdown`, or once input has closed and the video is
/// no longer playing.
pub async fn run_demo<P, W, F>(
    scheduler: &mut CaptionScheduler<P>,
    pump: &mut PresentationPump<TerminalPresenter<W>>,
    mut commands: mpsc::UnboundedReceiver<String>,
    shutdown: F,
) where
    P: MediaPlayer,
    W: io::Write,
    F: Future<Output = ()>,
{
    let mut ticker = pump.ticker();
    tokio::pin!(shutdown);
    let mut input_open = true;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Stop requested");
                scheduler.stop(pump.presenter_mut());
                break;
            }
            _ = scheduler.reveal_due() => {
                scheduler.start_reveal(pump.presenter_mut());
            }
            line = commands.recv(), if input_open => match line {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match line.parse::<DemoCommand>() {
                    Ok(command) => {
                        info!(%command, "Demo command");
                        let view = pump.presenter_mut();
                        match command {
                            DemoCommand::Play => scheduler.play(view),
                            DemoCommand::Pause => scheduler.pause(view),
                            DemoCommand::Stop => scheduler.stop(view),
                            DemoCommand::Quit => {
                                scheduler.stop(view);
                                break;
                            }
                        }
                    }
                    Err(e) => pump.presenter_mut().show(&e.to_string()),
                },
                None => input_open = false,
            },
            _ = ticker.tick() => {
                pump.tick();
                if !input_open && !scheduler.player().is_playing() && !scheduler.has_pending() {
                    info!("Input closed and playback finished");
                    break;
                }
            }
        }
    }

    pump.tick();
}
