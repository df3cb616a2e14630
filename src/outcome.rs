//! Per-item outcomes of an organizing run and the sink they are streamed to.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Why an entry was left where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// A directory whose name is on the folder skip list.
    FolderSkipListed,
    /// A name on the file skip list, or a hidden name.
    FileSkipListedOrHidden,
    /// A file whose extension no category lists.
    NoMatchingCategory,
    /// A directory that contains the destination root or lies inside it.
    DestinationFolder,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::FolderSkipListed => "folder-skip-listed",
            SkipReason::FileSkipListedOrHidden => "file-skip-listed-or-hidden",
            SkipReason::NoMatchingCategory => "no-matching-category",
            SkipReason::DestinationFolder => "destination-folder",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one source entry, or to one child of a flattened folder.
///
/// Destination paths are the final paths of the moved items, after any
/// collision renaming. In a dry run they are the paths a real run would use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutcomeRecord {
    Moved {
        item_name: String,
        category: String,
        destination_path: PathBuf,
    },
    Skipped {
        item_name: String,
        reason: SkipReason,
    },
    FolderFlattened {
        sub_item_name: String,
        destination_path: PathBuf,
    },
    FolderDeleted {
        folder_name: String,
    },
    FolderDeleteFailed {
        folder_name: String,
        cause: String,
    },
    MoveFailed {
        item_name: String,
        cause: String,
    },
}

impl OutcomeRecord {
    /// Name of the entry the record is about.
    pub fn item_name(&self) -> &str {
        match self {
            OutcomeRecord::Moved { item_name, .. }
            | OutcomeRecord::Skipped { item_name, .. }
            | OutcomeRecord::MoveFailed { item_name, .. } => item_name,
            OutcomeRecord::FolderFlattened { sub_item_name, .. } => sub_item_name,
            OutcomeRecord::FolderDeleted { folder_name }
            | OutcomeRecord::FolderDeleteFailed { folder_name, .. } => folder_name,
        }
    }

    /// True for records describing a filesystem change that happened (or would happen).
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            OutcomeRecord::Moved { .. }
                | OutcomeRecord::FolderFlattened { .. }
                | OutcomeRecord::FolderDeleted { .. }
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            OutcomeRecord::MoveFailed { .. } | OutcomeRecord::FolderDeleteFailed { .. }
        )
    }
}

/// Receives outcomes as the run produces them.
///
/// Any `FnMut(&OutcomeRecord)` closure is a sink.
pub trait ProgressSink {
    /// Called once, after the source listing, with the number of top-level entries.
    fn started(&mut self, _entries: usize) {}

    fn record(&mut self, outcome: &OutcomeRecord);

    /// Called after each top-level entry, however many records it produced.
    fn entry_finished(&mut self) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(&OutcomeRecord),
{
    fn record(&mut self, outcome: &OutcomeRecord) {
        self(outcome)
    }
}

/// Everything a run produced, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub records: Vec<OutcomeRecord>,
    pub dry_run: bool,
    /// Set when the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn moved_count(&self) -> usize {
        self.count(|r| matches!(r, OutcomeRecord::Moved { .. }))
    }

    pub fn flattened_count(&self) -> usize {
        self.count(|r| matches!(r, OutcomeRecord::FolderFlattened { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|r| matches!(r, OutcomeRecord::Skipped { .. }))
    }

    pub fn deleted_folder_count(&self) -> usize {
        self.count(|r| matches!(r, OutcomeRecord::FolderDeleted { .. }))
    }

    pub fn failure_count(&self) -> usize {
        self.count(OutcomeRecord::is_failure)
    }

    /// Number of files moved into each category, keyed by category name.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            if let OutcomeRecord::Moved { category, .. } = record {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn into_records(self) -> Vec<OutcomeRecord> {
        self.records
    }

    fn count(&self, pred: impl Fn(&OutcomeRecord) -> bool) -> usize {
        self.records.iter().filter(|&r| pred(r)).count()
    }
}
