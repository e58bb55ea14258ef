use kocho_core::pump::Presenter;
use std::io::{self, Write};
use tracing::warn;

/// Renders the conversation log and status line as plain terminal output.
///
/// The visible log is also kept in memory, since clearing a scrolled terminal
/// is not possible; a clear prints a divider instead.
pub struct TerminalPresenter<W> {
    out: W,
    transcript: Vec<String>,
    status: String,
    session_active: bool,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            transcript: Vec::new(),
            status: String::new(),
            session_active: false,
        }
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Whether the start control would currently be disabled.
    pub fn session_active(&self) -> bool {
        self.session_active
    }

    /// Prints a block of text outside the conversation log.
    pub fn show(&mut self, text: &str) {
        self.write(format_args!("{text}"));
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            warn!(error = %e, "Could not write to the terminal");
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn append_log(&mut self, line: &str) {
        self.write(format_args!("{line}"));
        self.transcript.push(line.to_string());
    }

    fn clear_log(&mut self) {
        self.transcript.clear();
        self.write(format_args!("{}", "-".repeat(40)));
    }

    fn set_status(&mut self, status: &str) {
        if self.status != status {
            self.write(format_args!("[{status}]"));
            self.status = status.to_string();
        }
    }

    fn session_started(&mut self) {
        self.session_active = true;
    }

    fn session_stopped(&mut self) {
        self.session_active = false;
    }
}
