//! Caption scripts: newline-delimited narration revealed alongside a video.

use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// An ordered sequence of non-empty caption lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionScript {
    lines: Vec<String>,
}

impl CaptionScript {
    /// Builds a script from raw text, trimming lines and skipping blank ones.
    pub fn parse(text: &str) -> Self {
        text.lines().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl<S: Into<String>> FromIterator<S> for CaptionScript {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            lines: iter
                .into_iter()
                .map(|line| Into::<String>::into(line).trim().to_string())
                .filter(|line| !line.is_empty())
                .collect(),
        }
    }
}

/// Resolves `<persona>-script.txt` files under a fixed directory.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    root: PathBuf,
}

impl ScriptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, persona: &str) -> PathBuf {
        self.root.join(format!("{persona}-script.txt"))
    }

    /// Loads the caption script for a persona. Absence yields an empty script.
    pub fn load(&self, persona: &str) -> CaptionScript {
        let path = self.path_for(persona);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let script = CaptionScript::parse(&text);
                debug!(%persona, lines = script.len(), "Caption script loaded");
                script
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(%persona, path = %path.display(), "No caption script");
                CaptionScript::default()
            }
            Err(e) => {
                warn!(
                    %persona,
                    path = %path.display(),
                    error = %e,
                    "Unreadable caption script; ignoring it"
                );
                CaptionScript::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_blank_lines_and_trims() {
        let script = CaptionScript::parse("  First line  \n\n\t\nSecond line\r\n   \nThird\n");
        assert_eq!(script.lines(), ["First line", "Second line", "Third"]);
        assert_eq!(script.line(1), Some("Second line"));
        assert_eq!(script.line(3), None);
    }

    #[test]
    fn test_load_from_store() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("helpdesk-script.txt"), "Hello\n\nWorld\n").unwrap();
        let store = ScriptStore::new(dir.path());

        let script = store.load("helpdesk");
        assert_eq!(script.len(), 2);
        assert_eq!(script.line(0), Some("Hello"));
    }

    #[test]
    fn test_missing_script_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ScriptStore::new(dir.path());
        assert!(store.load("nobody").is_empty());
    }

    #[test]
    fn test_collect_from_lines() {
        let script: CaptionScript = ["one", "", "two"].into_iter().collect();
        assert_eq!(script.lines(), ["one", "two"]);
    }
}
