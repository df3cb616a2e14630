//! Source and destination resolution.
//!
//! The organizer only ever sees a [`RunContext`]. Everything that depends on the
//! user's environment (home directory, today's date, the chosen source folder)
//! is resolved here, before a run starts.
//!
//! Destinations follow the layout `<root>/<YYYY-MM>/<SourceName>/`, with `<root>`
//! defaulting to `~/Documents/OrganizedFiles`.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while resolving run paths.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("could not determine the home directory: neither HOME nor USERPROFILE is set")]
    NoHomeDirectory,
    #[error("cannot name a destination after {}: it has no final component", .0.display())]
    UnnamedSource(PathBuf),
}

/// The two directories a run operates on, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl RunContext {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Well-known folders offered as sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceFolder {
    Desktop,
    Downloads,
}

impl SourceFolder {
    /// Folder name under the home directory, also used to name the destination.
    pub fn dir_name(&self) -> &'static str {
        match self {
            SourceFolder::Desktop => "Desktop",
            SourceFolder::Downloads => "Downloads",
        }
    }
}

/// Reads the home directory from `HOME`, falling back to `USERPROFILE`.
pub fn home_dir() -> Result<PathBuf, PathError> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or(PathError::NoHomeDirectory)
}

/// Month-year bucket name for a date, e.g. `2024-05`.
pub fn month_bucket(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Expands a leading `~` component against `home`.
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Builds [`RunContext`]s for a fixed home directory and date.
#[derive(Debug, Clone)]
pub struct PathResolver {
    home: PathBuf,
    date: NaiveDate,
    destination_root: Option<PathBuf>,
}

impl PathResolver {
    pub fn new(home: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            home: home.into(),
            date,
            destination_root: None,
        }
    }

    /// Resolver for the current user and today's local date.
    pub fn from_env() -> Result<Self, PathError> {
        Ok(Self::new(home_dir()?, chrono::Local::now().date_naive()))
    }

    /// Overrides the destination root. `~` is expanded.
    pub fn with_destination_root(mut self, root: Option<PathBuf>) -> Self {
        self.destination_root = root.map(|r| expand_home(&r, &self.home));
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn destination_root(&self) -> PathBuf {
        self.destination_root
            .clone()
            .unwrap_or_else(|| self.home.join("Documents").join("OrganizedFiles"))
    }

    /// Context for one of the well-known folders under home.
    pub fn resolve_folder(&self, folder: SourceFolder) -> RunContext {
        RunContext::new(
            self.home.join(folder.dir_name()),
            self.destination_for(folder.dir_name()),
        )
    }

    /// Context for an arbitrary source directory, named after its last component.
    pub fn resolve_custom(&self, source: &Path) -> Result<RunContext, PathError> {
        let source = expand_home(source, &self.home);
        // canonicalize so "." and "dir/.." still have a usable name
        let named = fs::canonicalize(&source).unwrap_or_else(|_| source.clone());
        let name = named
            .file_name()
            .ok_or_else(|| PathError::UnnamedSource(source.clone()))?
            .to_string_lossy()
            .into_owned();
        Ok(RunContext::new(source, self.destination_for(&name)))
    }

    fn destination_for(&self, source_name: &str) -> PathBuf {
        self.destination_root()
            .join(month_bucket(self.date))
            .join(source_name)
    }
}
