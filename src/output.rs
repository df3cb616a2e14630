//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and formatted tables. Outcome records reach the terminal
//! through one of the two [`ProgressSink`] implementations here: a colored,
//! human-readable [`ConsoleSink`] or a machine-readable [`JsonLinesSink`].

use crate::outcome::{OutcomeRecord, ProgressSink, RunSummary};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for runs
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use desksave::output::OutputFormatter;
    /// OutputFormatter::success("Desktop organized");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use desksave::output::OutputFormatter;
    /// OutputFormatter::error("cannot read source directory");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar counting top-level entries.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use desksave::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(12);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb
    }

    /// One uncolored line describing a record.
    pub fn describe(record: &OutcomeRecord) -> String {
        match record {
            OutcomeRecord::Moved {
                item_name,
                category,
                destination_path,
            } => format!(
                "{} → {}/ ({})",
                item_name,
                category,
                destination_path.display()
            ),
            OutcomeRecord::Skipped { item_name, reason } => {
                format!("{} skipped: {}", item_name, reason)
            }
            OutcomeRecord::FolderFlattened {
                sub_item_name,
                destination_path,
            } => format!("{} → {}", sub_item_name, destination_path.display()),
            OutcomeRecord::FolderDeleted { folder_name } => {
                format!("{}/ removed", folder_name)
            }
            OutcomeRecord::FolderDeleteFailed { folder_name, cause } => {
                format!("{}/ could not be removed: {}", folder_name, cause)
            }
            OutcomeRecord::MoveFailed { item_name, cause } => {
                format!("{} could not be moved: {}", item_name, cause)
            }
        }
    }

    /// The record line with its status marker, colored for the terminal.
    pub fn styled(record: &OutcomeRecord) -> String {
        let line = Self::describe(record);
        let marker = if record.is_failure() {
            "✗".red()
        } else if record.is_change() {
            "✓".green()
        } else {
            "-".dimmed()
        };
        let line = if record.is_failure() {
            line.red()
        } else if record.is_change() {
            line.normal()
        } else {
            line.dimmed()
        };
        format!("{} {}", marker, line)
    }

    /// Prints per-category move counts followed by the overall totals.
    pub fn summary_table(summary: &RunSummary) {
        Self::header(if summary.dry_run {
            "SUMMARY (dry run)"
        } else {
            "SUMMARY"
        });

        let counts = summary.category_counts();
        let width = counts.keys().map(String::len).max().unwrap_or(0).max(10);

        if !counts.is_empty() {
            println!("{:<width$} | {}", "Category".bold(), "Files".bold(), width = width);
            println!("{}", "-".repeat(width + 10));
            for (category, count) in &counts {
                println!(
                    "{:<width$} | {} {}",
                    category,
                    count.to_string().green(),
                    plural(*count, "file", "files"),
                    width = width
                );
            }
            println!("{}", "-".repeat(width + 10));
        }

        let rows = [
            ("Moved", summary.moved_count()),
            ("Flattened", summary.flattened_count()),
            ("Removed", summary.deleted_folder_count()),
            ("Skipped", summary.skipped_count()),
        ];
        for (label, count) in rows {
            println!("{:<width$} | {}", label.bold(), count, width = width);
        }
        let failed = summary.failure_count();
        let failed_text = if failed > 0 {
            failed.to_string().red().bold()
        } else {
            failed.to_string().normal()
        };
        println!("{:<width$} | {}", "Failed".bold(), failed_text, width = width);
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

/// Prints colored record lines, optionally above a progress bar.
pub struct ConsoleSink {
    bar: Option<ProgressBar>,
    quiet_skips: bool,
}

impl ConsoleSink {
    pub fn new(show_progress: bool) -> Self {
        Self {
            bar: show_progress.then(|| OutputFormatter::create_progress_bar(0)),
            quiet_skips: false,
        }
    }

    /// Hide `Skipped` records; they still count in the summary.
    pub fn quiet_skips(mut self, quiet: bool) -> Self {
        self.quiet_skips = quiet;
        self
    }

    /// Clears the progress bar.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn started(&mut self, entries: usize) {
        if let Some(bar) = &self.bar {
            bar.set_length(entries as u64);
        }
    }

    fn record(&mut self, outcome: &OutcomeRecord) {
        if self.quiet_skips && matches!(outcome, OutcomeRecord::Skipped { .. }) {
            return;
        }
        let line = OutputFormatter::styled(outcome);
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }

    fn entry_finished(&mut self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }
}

/// Writes each record as one line of JSON.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ProgressSink for JsonLinesSink<W> {
    fn record(&mut self, outcome: &OutcomeRecord) {
        let written = serde_json::to_writer(&mut self.writer, outcome)
            .map_err(io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to write outcome record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::SkipReason;
    use std::path::PathBuf;

    #[test]
    fn test_describe_lines() {
        let moved = OutcomeRecord::Moved {
            item_name: "photo.JPG".to_string(),
            category: "pictures".to_string(),
            destination_path: PathBuf::from("/out/pictures/photo.JPG"),
        };
        assert_eq!(
            OutputFormatter::describe(&moved),
            "photo.JPG → pictures/ (/out/pictures/photo.JPG)"
        );

        let skipped = OutcomeRecord::Skipped {
            item_name: "note.xyz".to_string(),
            reason: SkipReason::NoMatchingCategory,
        };
        assert_eq!(
            OutputFormatter::describe(&skipped),
            "note.xyz skipped: no-matching-category"
        );

        let failed = OutcomeRecord::FolderDeleteFailed {
            folder_name: "Old".to_string(),
            cause: "directory not empty".to_string(),
        };
        assert_eq!(
            OutputFormatter::describe(&failed),
            "Old/ could not be removed: directory not empty"
        );
    }

    #[test]
    fn test_json_lines_sink_writes_one_object_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record(&OutcomeRecord::FolderDeleted {
            folder_name: "OldStuff".to_string(),
        });
        sink.record(&OutcomeRecord::MoveFailed {
            item_name: "a.txt".to_string(),
            cause: "denied".to_string(),
        });

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["outcome"], "folder_deleted");
        assert_eq!(first["folder_name"], "OldStuff");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["outcome"], "move_failed");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "file", "files"), "file");
        assert_eq!(plural(0, "file", "files"), "files");
    }
}
