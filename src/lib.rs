//! desksave - sort a cluttered folder into a dated, categorized archive
//!
//! One run takes the immediate entries of a source directory (usually the
//! Desktop or Downloads folder) and files them under
//! `<root>/<YYYY-MM>/<source name>/`: files by extension category, leftover
//! subfolders flattened into a folder of their own. Skip lists and hidden
//! names keep entries in place. Every entry produces an [`OutcomeRecord`].

pub mod category_table;
pub mod cli;
pub mod config;
pub mod file_organizer;
pub mod organizer;
pub mod outcome;
pub mod output;
pub mod paths;
pub mod skip_policy;

pub use category_table::{Category, CategoryTable, CategoryTableError};
pub use config::{ConfigError, Settings};
pub use file_organizer::{FileOrganizer, MoveError};
pub use organizer::{OrganizeError, OrganizeResult, Organizer, run};
pub use outcome::{OutcomeRecord, ProgressSink, RunSummary, SkipReason};
pub use paths::{PathError, PathResolver, RunContext, SourceFolder};
pub use skip_policy::SkipPolicy;

pub use cli::{Cli, CliError, run_cli};
