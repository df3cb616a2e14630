//! Command-line interface module for desksave.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Settings and category table loading
//! - Source and destination resolution
//! - Running the organizer and reporting its outcomes

use crate::config::{ConfigError, Settings};
use crate::organizer::{OrganizeError, Organizer};
use crate::outcome::RunSummary;
use crate::output::{ConsoleSink, JsonLinesSink, OutputFormatter};
use crate::paths::{PathError, PathResolver, RunContext, SourceFolder};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Sort a cluttered folder into a dated, categorized archive.
#[derive(Debug, Clone, Parser)]
#[command(name = "desksave", version, about)]
pub struct Cli {
    /// Directory to organize. Overrides --from.
    pub source: Option<PathBuf>,

    /// Well-known folder under the home directory to organize.
    #[arg(long, value_enum, default_value_t = SourceFolder::Desktop)]
    pub from: SourceFolder,

    /// Root of the organized archive [default: ~/Documents/OrganizedFiles].
    #[arg(long, value_name = "ROOT")]
    pub dest: Option<PathBuf>,

    /// JSON category table to use instead of the configured or built-in one.
    #[arg(long, value_name = "FILE")]
    pub categories: Option<PathBuf>,

    /// Settings file to use instead of the discovered one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report what would happen without touching any files.
    #[arg(long)]
    pub dry_run: bool,

    /// Print one JSON object per outcome instead of colored lines.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Errors that end a CLI invocation with a failure status.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
}

/// Runs the CLI for the current user and today's date.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use desksave::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["desksave", "--from", "downloads", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(summary) => println!("{} files would move", summary.moved_count()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<RunSummary, CliError> {
    run_cli_with_resolver(cli, PathResolver::from_env()?)
}

/// Runs the CLI against an explicit home directory and date.
pub fn run_cli_with_resolver(cli: &Cli, resolver: PathResolver) -> Result<RunSummary, CliError> {
    let settings = Settings::load(cli.config.as_deref(), Some(resolver.home()))?;
    let table = settings.category_table(cli.categories.as_deref())?;

    let root = cli.dest.clone().or_else(|| settings.destination_root.clone());
    let resolver = resolver.with_destination_root(root);
    let ctx = resolve_context(cli, &resolver)?;
    tracing::debug!(
        source = %ctx.source.display(),
        destination = %ctx.destination.display(),
        categories = table.len(),
        "resolved run"
    );

    let organizer = Organizer::new(&table, &settings.skip).dry_run(cli.dry_run);

    if cli.json {
        let mut sink = JsonLinesSink::stdout();
        return Ok(organizer.run(&ctx, &mut sink)?);
    }

    if cli.dry_run {
        OutputFormatter::dry_run_notice("No files will be moved.");
    }
    OutputFormatter::info(&format!(
        "Organizing {} into {}",
        ctx.source.display(),
        ctx.destination.display()
    ));

    let mut sink = ConsoleSink::new(true).quiet_skips(cli.verbose == 0);
    let result = organizer.run(&ctx, &mut sink);
    sink.finish();
    let summary = result?;

    OutputFormatter::summary_table(&summary);
    if summary.failure_count() > 0 {
        OutputFormatter::warning("Some items could not be organized. Please review errors above.");
    } else if summary.dry_run {
        OutputFormatter::success("Dry run complete. No files were modified.");
    } else {
        OutputFormatter::success("Organization complete!");
    }
    Ok(summary)
}

fn resolve_context(cli: &Cli, resolver: &PathResolver) -> Result<RunContext, PathError> {
    match &cli.source {
        Some(source) => resolver.resolve_custom(source),
        None => Ok(resolver.resolve_folder(cli.from)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["desksave"]);
        assert_eq!(cli.source, None);
        assert_eq!(cli.from, SourceFolder::Desktop);
        assert!(!cli.dry_run);
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "desksave",
            "--from",
            "downloads",
            "--dest",
            "/srv/sorted",
            "--dry-run",
            "--json",
            "-vv",
        ]);
        assert_eq!(cli.from, SourceFolder::Downloads);
        assert_eq!(cli.dest, Some(PathBuf::from("/srv/sorted")));
        assert!(cli.dry_run);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_unknown_source_folder_rejected() {
        assert!(Cli::try_parse_from(["desksave", "--from", "pictures"]).is_err());
    }

    #[test]
    fn test_explicit_source_wins_over_from() {
        let cli = Cli::parse_from(["desksave", "/tmp/Inbox", "--from", "downloads"]);
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let resolver = PathResolver::new("/home/ana", date);
        let ctx = resolve_context(&cli, &resolver).unwrap();
        assert_eq!(ctx.source, PathBuf::from("/tmp/Inbox"));
        assert!(ctx.destination.ends_with("2024-05/Inbox"));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
