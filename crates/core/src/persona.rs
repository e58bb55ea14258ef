//! Persona Store
//!
//! A persona is a plain-text file whose whole content is the system prompt the
//! dialogue engine is primed with. Files live under a single directory and are
//! named `<persona>.txt`. A missing persona is never fatal: callers fall back to
//! [`Persona::fallback`].

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use serde::Serialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Prompt used whenever a persona file cannot be loaded.
pub const FALLBACK_PROMPT: &str = "You are a helpful AI assistant.";

const PERSONA_EXTENSION: &str = "txt";
const MISSING_FIELD: &str = "-";

#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("Persona file '{}' not found.{}", .path.display(), suggestion_hint(.suggestion))]
    Missing {
        path: PathBuf,
        suggestion: Option<String>,
    },
    #[error("Failed to read persona file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|name| format!(" Did you mean '{name}'?"))
        .unwrap_or_default()
}

/// An immutable, loaded persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub prompt: String,
}

impl Persona {
    /// A persona carrying the generic assistant prompt.
    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: FALLBACK_PROMPT.to_string(),
        }
    }
}

/// The headline fields shown for a persona that has no video demonstration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonaSummary {
    pub attacker: String,
    pub role: String,
    pub target: String,
    pub pretext: String,
    pub primary_goal: String,
}

impl Default for PersonaSummary {
    fn default() -> Self {
        Self {
            attacker: MISSING_FIELD.into(),
            role: MISSING_FIELD.into(),
            target: MISSING_FIELD.into(),
            pretext: MISSING_FIELD.into(),
            primary_goal: MISSING_FIELD.into(),
        }
    }
}

impl PersonaSummary {
    /// Extracts the summary fields from a persona prompt.
    ///
    /// Fields are `Key: value` lines matched case-insensitively at the start of
    /// a line; the goal is the body of the `# Goals` section.
    pub fn parse(content: &str) -> Self {
        Self {
            attacker: parse_field(content, "Your Name"),
            role: parse_field(content, "Your Role"),
            target: parse_field(content, "Your Target"),
            pretext: parse_field(content, "The Pretext"),
            primary_goal: parse_goals(content).unwrap_or_else(|| MISSING_FIELD.into()),
        }
    }
}

fn parse_field(content: &str, key: &str) -> String {
    content
        .lines()
        .find_map(|line| {
            let head = line.get(..key.len())?;
            if !head.eq_ignore_ascii_case(key) {
                return None;
            }
            line[key.len()..]
                .strip_prefix(':')
                .map(|value| value.trim().to_string())
        })
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| MISSING_FIELD.into())
}

fn parse_goals(content: &str) -> Option<String> {
    let mut lines = content.lines();
    lines
        .by_ref()
        .find(|line| is_goals_heading(line))?;
    let body: Vec<&str> = lines.take_while(|line| !line.starts_with('#')).collect();
    let goal = body.join("\n").trim().replace('\n', " ");
    (!goal.is_empty()).then_some(goal)
}

/// `# Goals`, `## Goals` and so on, at any heading depth.
fn is_goals_heading(line: &str) -> bool {
    let heading = line.trim();
    let title = heading.trim_start_matches('#');
    title.len() < heading.len() && title.trim().eq_ignore_ascii_case("goals")
}

/// Resolves persona identifiers to files under a fixed directory.
#[derive(Debug, Clone)]
pub struct PersonaStore {
    root: PathBuf,
}

impl PersonaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{PERSONA_EXTENSION}"))
    }

    /// Reads the persona fresh from disk. Repeated loads are idempotent.
    pub fn load(&self, name: &str) -> Result<Persona, PersonaError> {
        let path = self.path_for(name);
        match fs::read_to_string(&path) {
            Ok(prompt) => {
                debug!(persona = %name, path = %path.display(), "Persona loaded");
                Ok(Persona {
                    name: name.to_string(),
                    prompt,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(PersonaError::Missing {
                suggestion: self.suggest(name),
                path,
            }),
            Err(source) => Err(PersonaError::Io { path, source }),
        }
    }

    /// Lists available persona identifiers in alphabetical order.
    ///
    /// An absent directory is treated as an empty catalogue.
    pub fn list(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|s| s.to_str()) == Some(PERSONA_EXTENSION)
            {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Summary fields for a persona; every field is `-` if the file is absent.
    pub fn summary(&self, name: &str) -> PersonaSummary {
        match fs::read_to_string(self.path_for(name)) {
            Ok(content) => PersonaSummary::parse(&content),
            Err(_) => PersonaSummary::default(),
        }
    }

    /// The closest existing persona name, if any resembles `name`.
    pub fn suggest(&self, name: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default();
        self.list()
            .ok()?
            .into_iter()
            .filter_map(|candidate| {
                matcher
                    .fuzzy_match(&candidate, name)
                    .map(|score| (score, candidate))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, candidate)| candidate)
    }
}
