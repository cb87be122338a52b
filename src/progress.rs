//! Progress reporting for the resolver
//!
//! Provides a round-by-round spinner using indicatif and the banner and
//! summary blocks. Everything here writes to stderr; stdout may carry the
//! flag list.

use crate::resolver::{ResolveResult, RoundProgress};
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays resolution status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());

        if let Ok(spinner) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display after a round
    pub fn update(&self, progress: &RoundProgress) {
        let msg = format!(
            "Round: {} | Pending: {} | Requeued: {} | Dirs: {} | Dropped: {}",
            format_number(progress.round),
            format_number(progress.pending as u64),
            format_number(progress.requeued as u64),
            format_number(progress.directories as u64),
            format_number(progress.dropped),
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the run, with the index/search timing split
pub fn print_summary(
    result: &ResolveResult,
    indexed_files: usize,
    index_time: Duration,
    output: &str,
) {
    let index_secs = index_time.as_secs_f64();
    let search_secs = result.duration.as_secs_f64();

    eprintln!();
    if result.completed {
        eprintln!("{}", style("Resolution Complete").green().bold());
    } else {
        eprintln!("{}", style("Resolution Interrupted").yellow().bold());
    }
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Headers indexed:").bold(), format_number(indexed_files as u64));
    eprintln!("  {} {}", style("Source files:").bold(), format_number(result.files));
    eprintln!("  {} {}", style("Rounds:").bold(), format_number(result.rounds));
    eprintln!("  {} {}", style("Resolutions:").bold(), format_number(result.resolutions));
    eprintln!("  {} {}", style("Directories:").bold(), format_number(result.directories as u64));
    if result.misses > 0 {
        eprintln!("  {} {}", style("Header misses:").yellow().bold(), format_number(result.misses));
    }
    if result.dropped > 0 {
        eprintln!(
            "  {} {}",
            style("Files dropped:").yellow().bold(),
            format_number(result.dropped)
        );
    }
    eprintln!(
        "  {} total:{:.2}s index:{:.2}s search:{:.2}s",
        style("Time:").bold(),
        index_secs + search_secs,
        index_secs,
        search_secs
    );
    eprintln!("  {} {}", style("Output:").bold(), output);
    eprintln!();
}

/// Print a header at the start of the run
pub fn print_header(src_root: &str, roots: usize, workers: usize, output: &str) {
    eprintln!();
    eprintln!("{} {}", style("include-finder").cyan().bold(), env!("CARGO_PKG_VERSION"));
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Source:").bold(), src_root);
    eprintln!("  {} {}", style("Header roots:").bold(), roots);
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    eprintln!("  {} {}", style("Output:").bold(), output);
    eprintln!();
}
