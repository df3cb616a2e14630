//! Settings file and category table loading.
//!
//! Settings are stored in TOML with the following structure, every key optional:
//!
//! ```toml
//! categories_file = "~/.config/desksave/file_types.json"
//! destination_root = "~/Documents/OrganizedFiles"
//!
//! [skip]
//! files = [".DS_Store", "README.md"]
//! folders = ["DeskSave", "Downloads", "Documents"]
//! ```
//!
//! Relative paths in a settings file are resolved against the file's own
//! directory, and a leading `~` against the home directory.

use crate::category_table::{CategoryTable, CategoryTableError};
use crate::paths::expand_home;
use crate::skip_policy::SkipPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".desksaverc.toml";

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("invalid configuration in {}: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },
    /// IO error while reading a configuration or category file.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The category table file is not a valid table.
    #[error("invalid category table in {}: {source}", .path.display())]
    Categories {
        path: PathBuf,
        source: CategoryTableError,
    },
}

fn default_skip_policy() -> SkipPolicy {
    SkipPolicy::new([".DS_Store", "README.md"], ["DeskSave", "Downloads", "Documents"])
}

/// User settings for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// JSON category table to use instead of the built-in one.
    #[serde(default)]
    pub categories_file: Option<PathBuf>,
    /// Replaces `~/Documents/OrganizedFiles` as the destination root.
    #[serde(default)]
    pub destination_root: Option<PathBuf>,
    /// Names exempt from organizing.
    #[serde(default = "default_skip_policy")]
    pub skip: SkipPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            categories_file: None,
            destination_root: None,
            skip: default_skip_policy(),
        }
    }
}

impl Settings {
    /// Load settings from a file, with fallback to defaults.
    ///
    /// Attempts to load settings in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.desksaverc.toml` in the current directory
    /// 3. Look for `~/.config/desksave/config.toml` when `home` is known
    /// 4. Fall back to default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a file is explicitly provided but cannot be read,
    /// or if any file found is not valid.
    pub fn load(config_path: Option<&Path>, home: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path, home);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config, home);
        }

        if let Some(home) = home {
            let home_config = home.join(".config").join("desksave").join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config, Some(home));
            }
        }

        tracing::debug!("no settings file found, using defaults");
        Ok(Self::default())
    }

    /// Load settings from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if TOML parsing fails.
    /// Returns `ConfigError::Io` if file cannot be read.
    fn load_from_file(path: &Path, home: Option<&Path>) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut settings: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let base = path.parent().unwrap_or(Path::new("."));
        let resolve = |p: PathBuf| {
            let p = match home {
                Some(home) => expand_home(&p, home),
                None => p,
            };
            if p.is_relative() { base.join(p) } else { p }
        };
        settings.categories_file = settings.categories_file.map(resolve);
        settings.destination_root = settings.destination_root.map(resolve);

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// The category table for a run: `override_path`, then `categories_file`,
    /// then the built-in table.
    pub fn category_table(&self, override_path: Option<&Path>) -> Result<CategoryTable, ConfigError> {
        match override_path.or(self.categories_file.as_deref()) {
            Some(path) => load_category_table(path),
            None => Ok(CategoryTable::builtin()),
        }
    }
}

/// Reads a category table from a JSON file.
pub fn load_category_table(path: &Path) -> Result<CategoryTable, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = CategoryTable::from_json(&content).map_err(|source| ConfigError::Categories {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), categories = table.len(), "loaded category table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings_skip_lists() {
        let settings = Settings::default();
        assert!(settings.skip.files.contains(".DS_Store"));
        assert!(settings.skip.files.contains("README.md"));
        assert!(settings.skip.folders.contains("Documents"));
        assert!(settings.categories_file.is_none());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = Settings::load(Some(&temp.path().join("absent.toml")), None);
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_home_config_is_found() {
        let home = TempDir::new().unwrap();
        let dir = home.path().join(".config").join("desksave");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "[skip]\nfolders = [\"Projects\"]\n").unwrap();

        let settings = Settings::load(None, Some(home.path())).unwrap();
        assert!(settings.skip.folders.contains("Projects"));
        assert!(settings.skip.files.is_empty());
    }

    #[test]
    fn test_missing_skip_table_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cfg.toml");
        fs::write(&path, "destination_root = \"/srv/sorted\"\n").unwrap();

        let settings = Settings::load(Some(&path), None).unwrap();
        assert_eq!(settings.destination_root, Some(PathBuf::from("/srv/sorted")));
        assert_eq!(settings.skip, default_skip_policy());
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cfg.toml");
        fs::write(&path, "categories_file = \"types.json\"\n").unwrap();

        let settings = Settings::load(Some(&path), None).unwrap();
        assert_eq!(settings.categories_file, Some(temp.path().join("types.json")));
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cfg.toml");
        fs::write(&path, "[skip\nfiles = 3").unwrap();

        let err = Settings::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigInvalid { .. }));
        assert!(err.to_string().contains("cfg.toml"));
    }

    #[test]
    fn test_category_table_sources() {
        let temp = TempDir::new().unwrap();
        let json = temp.path().join("types.json");
        fs::write(&json, r#"{"Images": {"extensions": ["jpg"]}}"#).unwrap();

        let settings = Settings {
            categories_file: Some(json.clone()),
            ..Default::default()
        };
        assert_eq!(settings.category_table(None).unwrap().len(), 1);

        let builtin = Settings::default().category_table(None).unwrap();
        assert_eq!(builtin, CategoryTable::builtin());

        let bad = temp.path().join("bad.json");
        fs::write(&bad, "{not json").unwrap();
        assert!(matches!(
            settings.category_table(Some(&bad)),
            Err(ConfigError::Categories { .. })
        ));
    }
}
