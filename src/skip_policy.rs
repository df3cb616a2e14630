//! Names exempt from organizing.
//!
//! Matching is by exact, case-sensitive name. On top of the two lists, any
//! name starting with [`HIDDEN_MARKER`] is skipped, whether it names a file or
//! a directory.
//!
//! In a settings file the policy is the `[skip]` table:
//!
//! ```toml
//! [skip]
//! files = [".DS_Store", "README.md"]
//! folders = ["DeskSave", "Downloads", "Documents"]
//! ```

use crate::outcome::SkipReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Leading character of hidden names.
pub const HIDDEN_MARKER: char = '.';

/// Exact-name skip lists for files and folders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipPolicy {
    /// Names skipped whether they are files or directories.
    #[serde(default)]
    pub files: BTreeSet<String>,
    /// Names skipped only when they are directories.
    #[serde(default)]
    pub folders: BTreeSet<String>,
}

impl SkipPolicy {
    pub fn new<F, D, S, T>(files: F, folders: D) -> Self
    where
        F: IntoIterator<Item = S>,
        D: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            folders: folders.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_hidden(name: &str) -> bool {
        name.starts_with(HIDDEN_MARKER)
    }

    /// Decides whether an entry is skipped, and why.
    ///
    /// The folder list is consulted first, and only for directories. The file
    /// list and the hidden rule then apply to every entry.
    pub fn check(&self, name: &str, is_directory: bool) -> Option<SkipReason> {
        if is_directory && self.folders.contains(name) {
            Some(SkipReason::FolderSkipListed)
        } else if self.files.contains(name) || Self::is_hidden(name) {
            Some(SkipReason::FileSkipListedOrHidden)
        } else {
            None
        }
    }
}
