//! The single-pass organizing engine.
//!
//! One run lists the immediate entries of the source directory, in file-name
//! order, and handles each one:
//!
//! 1. skip-listed folders, skip-listed files and hidden names are left alone;
//! 2. other directories are flattened: their immediate children move into
//!    `destination/<folder>/` and the emptied folder is removed;
//! 3. files are classified by extension and moved into
//!    `destination/<category>/`, or left in place when no category matches.
//!
//! Only a failure to list the source or create the destination aborts a run.
//! Anything going wrong with a single entry becomes an outcome record and the
//! run carries on.

use crate::category_table::CategoryTable;
use crate::file_organizer::{FileOrganizer, MoveResult};
use crate::outcome::{OutcomeRecord, ProgressSink, RunSummary, SkipReason};
use crate::paths::RunContext;
use crate::skip_policy::SkipPolicy;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Failures that abort a run before any entry is processed.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// The source directory could not be listed.
    #[error("cannot read source directory {}: {source}", .path.display())]
    SourceUnreadable { path: PathBuf, source: io::Error },
    /// The destination root could not be created.
    #[error("cannot create destination directory {}: {source}", .path.display())]
    DestinationUnwritable { path: PathBuf, source: io::Error },
}

/// Result type for organizing runs.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// One entry of a directory listing.
#[derive(Debug)]
struct DirectoryEntry {
    name: String,
    path: PathBuf,
    is_directory: bool,
}

/// Lists the immediate entries of `dir`, sorted by file name.
///
/// Symlinks are not followed, so a link to a directory is listed as a file.
/// Entries that vanish while being listed are dropped.
fn list_entries(dir: &Path) -> io::Result<Vec<DirectoryEntry>> {
    let mut entries: Vec<DirectoryEntry> = fs::read_dir(dir)?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .map(|entry| DirectoryEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_directory: entry.file_type().map(|t| t.is_dir()).unwrap_or(false),
            path: entry.path(),
        })
        .collect();
    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(entries)
}

/// Recognizes source folders that overlap the destination root: folders that
/// contain it, and folders that lie inside it. The second case covers a source
/// that is itself the destination, or sits within it.
struct DestinationGuard {
    destination: PathBuf,
    canonical: Option<PathBuf>,
}

impl DestinationGuard {
    fn new(destination: &Path) -> Self {
        Self {
            destination: destination.to_path_buf(),
            canonical: fs::canonicalize(destination).ok(),
        }
    }

    fn overlaps_destination(&self, dir: &Path) -> bool {
        if self.destination.starts_with(dir) || dir.starts_with(&self.destination) {
            return true;
        }
        match (&self.canonical, fs::canonicalize(dir)) {
            (Some(destination), Ok(dir)) => {
                destination.starts_with(&dir) || dir.starts_with(destination)
            }
            _ => false,
        }
    }
}

/// Forwards records to the caller's sink and keeps them for the summary.
struct Recorder<'s> {
    sink: &'s mut dyn ProgressSink,
    records: Vec<OutcomeRecord>,
    /// Destinations claimed so far by a dry run, which leaves the disk untouched.
    planned: HashSet<PathBuf>,
}

impl Recorder<'_> {
    fn emit(&mut self, record: OutcomeRecord) {
        self.sink.record(&record);
        self.records.push(record);
    }
}

/// Sorts a source directory into a destination tree.
///
/// The organizer borrows its rules and keeps no state between runs.
///
/// # Examples
///
/// ```no_run
/// use desksave::{CategoryTable, Organizer, RunContext, SkipPolicy};
///
/// let table = CategoryTable::builtin();
/// let policy = SkipPolicy::new([".DS_Store"], ["Projects"]);
/// let ctx = RunContext::new("/home/me/Desktop", "/home/me/Documents/OrganizedFiles/2024-05/Desktop");
///
/// let summary = Organizer::new(&table, &policy)
///     .run(&ctx, &mut |record: &desksave::OutcomeRecord| println!("{:?}", record))
///     .expect("source unreadable or destination unwritable");
/// println!("moved {} files", summary.moved_count());
/// ```
pub struct Organizer<'a> {
    table: &'a CategoryTable,
    policy: &'a SkipPolicy,
    dry_run: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Organizer<'a> {
    pub fn new(table: &'a CategoryTable, policy: &'a SkipPolicy) -> Self {
        Self {
            table,
            policy,
            dry_run: false,
            cancel: None,
        }
    }

    /// When set, the run reports what it would do without touching the filesystem.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Checked before each top-level entry; once it reads `true` the run stops.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Performs one pass over `ctx.source`.
    ///
    /// # Errors
    ///
    /// `SourceUnreadable` if the source cannot be listed, checked before any
    /// mutation. `DestinationUnwritable` if the destination root cannot be
    /// created. Per-entry failures are reported as records instead.
    pub fn run(
        &self,
        ctx: &RunContext,
        sink: &mut dyn ProgressSink,
    ) -> OrganizeResult<RunSummary> {
        let entries =
            list_entries(&ctx.source).map_err(|source| OrganizeError::SourceUnreadable {
                path: ctx.source.clone(),
                source,
            })?;

        if !self.dry_run {
            fs::create_dir_all(&ctx.destination).map_err(|source| {
                OrganizeError::DestinationUnwritable {
                    path: ctx.destination.clone(),
                    source,
                }
            })?;
        }

        info!(
            source = %ctx.source.display(),
            destination = %ctx.destination.display(),
            entries = entries.len(),
            dry_run = self.dry_run,
            "organizing"
        );

        let guard = DestinationGuard::new(&ctx.destination);
        let mut recorder = Recorder {
            sink,
            records: Vec::new(),
            planned: HashSet::new(),
        };
        let mut cancelled = false;

        recorder.sink.started(entries.len());
        for entry in &entries {
            if self.is_cancelled() {
                warn!("run cancelled before {}", entry.name);
                cancelled = true;
                break;
            }
            self.process_entry(entry, ctx, &guard, &mut recorder);
            recorder.sink.entry_finished();
        }

        let summary = RunSummary {
            records: recorder.records,
            dry_run: self.dry_run,
            cancelled,
        };
        info!(
            moved = summary.moved_count(),
            flattened = summary.flattened_count(),
            skipped = summary.skipped_count(),
            failed = summary.failure_count(),
            "run finished"
        );
        Ok(summary)
    }

    fn process_entry(
        &self,
        entry: &DirectoryEntry,
        ctx: &RunContext,
        guard: &DestinationGuard,
        out: &mut Recorder<'_>,
    ) {
        if let Some(reason) = self.policy.check(&entry.name, entry.is_directory) {
            debug!(item = %entry.name, %reason, "skipping");
            out.emit(OutcomeRecord::Skipped {
                item_name: entry.name.clone(),
                reason,
            });
        } else if entry.is_directory {
            if guard.overlaps_destination(&entry.path) {
                debug!(item = %entry.name, "skipping folder overlapping the destination");
                out.emit(OutcomeRecord::Skipped {
                    item_name: entry.name.clone(),
                    reason: SkipReason::DestinationFolder,
                });
            } else {
                self.flatten(entry, ctx, out);
            }
        } else {
            self.classify_and_move(entry, ctx, out);
        }
    }

    fn classify_and_move(&self, entry: &DirectoryEntry, ctx: &RunContext, out: &mut Recorder<'_>) {
        let Some(category) = self.table.classify(&entry.name) else {
            debug!(item = %entry.name, "no matching category");
            out.emit(OutcomeRecord::Skipped {
                item_name: entry.name.clone(),
                reason: SkipReason::NoMatchingCategory,
            });
            return;
        };

        match self.move_into(&entry.path, &ctx.destination.join(category.name()), out) {
            Ok(destination_path) => {
                info!(item = %entry.name, category = category.name(), "moved");
                out.emit(OutcomeRecord::Moved {
                    item_name: entry.name.clone(),
                    category: category.name().to_string(),
                    destination_path,
                });
            }
            Err(e) => {
                warn!(item = %entry.name, error = %e, "move failed");
                out.emit(OutcomeRecord::MoveFailed {
                    item_name: entry.name.clone(),
                    cause: e.to_string(),
                });
            }
        }
    }

    fn flatten(&self, folder: &DirectoryEntry, ctx: &RunContext, out: &mut Recorder<'_>) {
        let target_dir = match folder.path.file_name() {
            Some(name) => ctx.destination.join(name),
            None => ctx.destination.join(&folder.name),
        };

        if !self.dry_run
            && let Err(e) = FileOrganizer::ensure_dir(&target_dir)
        {
            warn!(folder = %folder.name, error = %e, "cannot create folder destination");
            out.emit(OutcomeRecord::MoveFailed {
                item_name: folder.name.clone(),
                cause: e.to_string(),
            });
            return;
        }

        let children = match list_entries(&folder.path) {
            Ok(children) => children,
            Err(e) => {
                warn!(folder = %folder.name, error = %e, "cannot list folder");
                out.emit(OutcomeRecord::MoveFailed {
                    item_name: folder.name.clone(),
                    cause: format!("cannot list {}: {}", folder.path.display(), e),
                });
                return;
            }
        };

        for child in &children {
            match self.move_into(&child.path, &target_dir, out) {
                Ok(destination_path) => {
                    info!(folder = %folder.name, item = %child.name, "moved out of folder");
                    out.emit(OutcomeRecord::FolderFlattened {
                        sub_item_name: child.name.clone(),
                        destination_path,
                    });
                }
                Err(e) => {
                    warn!(folder = %folder.name, item = %child.name, error = %e, "move failed");
                    out.emit(OutcomeRecord::MoveFailed {
                        item_name: child.name.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        out.emit(self.remove_folder(folder));
    }

    fn remove_folder(&self, folder: &DirectoryEntry) -> OutcomeRecord {
        if self.dry_run {
            return OutcomeRecord::FolderDeleted {
                folder_name: folder.name.clone(),
            };
        }
        match FileOrganizer::remove_empty_dir(&folder.path) {
            Ok(()) => {
                info!(folder = %folder.name, "deleted emptied folder");
                OutcomeRecord::FolderDeleted {
                    folder_name: folder.name.clone(),
                }
            }
            Err(e) => {
                warn!(folder = %folder.name, error = %e, "could not delete folder");
                OutcomeRecord::FolderDeleteFailed {
                    folder_name: folder.name.clone(),
                    cause: e.to_string(),
                }
            }
        }
    }

    fn move_into(
        &self,
        item: &Path,
        target_dir: &Path,
        out: &mut Recorder<'_>,
    ) -> MoveResult<PathBuf> {
        if !self.dry_run {
            return FileOrganizer::move_into(item, target_dir);
        }
        let planned = FileOrganizer::plan_move_reserving(item, target_dir, &out.planned)?;
        out.planned.insert(planned.clone());
        Ok(planned)
    }
}

/// Runs one pass with no progress sink and returns the records.
pub fn run(
    source: &Path,
    destination: &Path,
    table: &CategoryTable,
    policy: &SkipPolicy,
) -> OrganizeResult<Vec<OutcomeRecord>> {
    let ctx = RunContext::new(source, destination);
    let mut ignore = |_: &OutcomeRecord| {};
    Organizer::new(table, policy)
        .run(&ctx, &mut ignore)
        .map(RunSummary::into_records)
}
