//! Configuration types for include-finder
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - File extension filters for source and header files

use crate::error::ConfigError;
use clap::Parser;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Output path meaning "write to standard output"
pub const STDOUT_MARKER: &str = "-";

/// Discover include search directories for a source tree
#[derive(Parser, Debug, Clone)]
#[command(
    name = "include-finder",
    version,
    about = "Discover the -I flags a source tree needs to resolve its headers",
    long_about = "Indexes one or more header trees, then runs the compiler in dependency-listing \
                  mode over every source file, repeatedly, until the set of include directories \
                  stops growing.\n\n\
                  The result is a list of -I flags suitable for .clang_complete and similar \
                  editor tooling.",
    after_help = "EXAMPLES:\n    \
        include-finder -s /opt/sdk/include src/\n    \
        include-finder -s third_party -s vendor/include -o - .\n    \
        include-finder -s include -x -DLINUX -x -std=c++17 -w 16 src/\n    \
        CC=clang include-finder -s include --no-system ."
)]
pub struct CliArgs {
    /// Source tree to resolve
    #[arg(value_name = "SRC_DIR")]
    pub src_dir: PathBuf,

    /// Header root to index (can be repeated)
    #[arg(short = 's', long = "search-root", value_name = "DIR", action = clap::ArgAction::Append)]
    pub search_roots: Vec<PathBuf>,

    /// Extra flag forwarded to the compiler (can be repeated)
    #[arg(
        short = 'x',
        long = "cc-flag",
        value_name = "FLAG",
        action = clap::ArgAction::Append,
        allow_hyphen_values = true
    )]
    pub cc_flags: Vec<String>,

    /// Source file suffixes
    #[arg(long, default_value = ".c .cc .cpp", value_name = "SUFFIXES")]
    pub src_suffix: String,

    /// Header file suffixes
    #[arg(long, default_value = ".h .hpp", value_name = "SUFFIXES")]
    pub header_suffix: String,

    /// Output file, '-' means stdout
    #[arg(short, long, default_value = ".clang_complete", value_name = "FILE")]
    pub output: PathBuf,

    /// Do not append the compiler's built-in include directories to the output
    #[arg(long)]
    pub no_system: bool,

    /// Number of concurrent compiler invocations
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Compiler used for dependency listing
    #[arg(long, env = "CC", default_value = "gcc", value_name = "PATH")]
    pub cc: String,

    /// Quiet mode - suppress banner, progress and summary
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (per-file and per-directory detail)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    // Compiler invocations are CPU bound
    num_cpus::get()
}

/// A set of accepted file extensions, stored without the leading dot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    exts: BTreeSet<String>,
}

impl ExtensionSet {
    /// Parse a list such as `".c .cc .cpp"` or `"h,hpp"`
    pub fn parse(list: &str) -> Self {
        let exts = list
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_start_matches('.').to_string())
            .collect();
        Self { exts }
    }

    /// Check whether the path's extension is accepted
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy())
            .unwrap_or_default();
        self.exts.contains(&*ext)
    }

    pub fn is_empty(&self) -> bool {
        self.exts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exts.len()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let exts = iter
            .into_iter()
            .map(|s| s.as_ref().trim_start_matches('.').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { exts }
    }
}

/// Where the final flag list goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    pub fn display_name(&self) -> String {
        match self {
            OutputTarget::Stdout => "<stdout>".to_string(),
            OutputTarget::File(path) => path.display().to_string(),
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Canonical source root
    pub src_root: PathBuf,

    /// Header roots, in command-line order
    pub search_roots: Vec<PathBuf>,

    /// Extra compiler flags
    pub cc_flags: Vec<String>,

    /// Accepted source file extensions
    pub source_exts: ExtensionSet,

    /// Accepted header file extensions
    pub header_exts: ExtensionSet,

    /// Output destination
    pub output: OutputTarget,

    /// Append the compiler's built-in directories to the output
    pub include_system: bool,

    /// Number of concurrent compiler invocations
    pub worker_count: usize,

    /// Compiler program
    pub cc: String,

    /// Show banner, progress and summary
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl FinderConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        // Validate worker count
        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        let src_root =
            std::fs::canonicalize(&args.src_dir).map_err(|e| ConfigError::InvalidSourceRoot {
                path: args.src_dir.clone(),
                reason: e.to_string(),
            })?;

        let source_exts = ExtensionSet::parse(&args.src_suffix);
        if source_exts.is_empty() {
            return Err(ConfigError::EmptyExtensions { kind: "source" });
        }
        let header_exts = ExtensionSet::parse(&args.header_suffix);
        if header_exts.is_empty() {
            return Err(ConfigError::EmptyExtensions { kind: "header" });
        }

        let output = if args.output.as_os_str() == STDOUT_MARKER {
            OutputTarget::Stdout
        } else {
            // Validate output path
            if let Some(parent) = args.output.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(ConfigError::InvalidOutputPath {
                        path: args.output.clone(),
                        reason: format!("Parent directory '{}' does not exist", parent.display()),
                    });
                }
            }
            OutputTarget::File(args.output)
        };

        Ok(Self {
            src_root,
            search_roots: args.search_roots,
            cc_flags: args.cc_flags,
            source_exts,
            header_exts,
            output,
            include_system: !args.no_system,
            worker_count: args.workers,
            cc: args.cc,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }
}
