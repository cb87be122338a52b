//! Error types for include-finder
//!
//! This module defines the error hierarchy that covers:
//! - Header index construction and lookup errors
//! - External toolchain invocation errors
//! - Configuration and CLI errors
//! - Worker pool errors
//!
//! Only setup errors are fatal. Per-header misses and per-file toolchain
//! failures are carried as values (`ResolveOutcome`) and never abort a round.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the include-finder application
#[derive(Error, Debug)]
pub enum FinderError {
    /// Header index errors
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Toolchain errors
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    /// Worker pool errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (output file, source walk, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Header index construction and lookup errors
#[derive(Error, Debug, Clone)]
pub enum IndexError {
    /// The header root itself could not be resolved or opened
    #[error("Cannot index header root '{path}': {reason}")]
    RootUnreadable { path: PathBuf, reason: String },

    /// A directory inside a header root could not be listed
    #[error("Failed to read directory '{path}': {reason}")]
    ReadDirFailed { path: PathBuf, reason: String },

    /// An entry inside a header root could not be stat'ed
    #[error("Failed to stat '{path}': {reason}")]
    StatFailed { path: PathBuf, reason: String },

    /// Header path has no match in any indexed tree
    #[error("Header '{header}' not found in any header root")]
    NotFound { header: String },
}

impl IndexError {
    /// Check if this is a lookup miss rather than a build failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound { .. })
    }
}

/// External compiler toolchain errors
#[derive(Error, Debug, Clone)]
pub enum ToolchainError {
    /// The compiler process could not be started
    #[error("Failed to run '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    /// The dependency listing produced nothing usable
    #[error("No dependency output for '{file}' ({status}): {stderr}")]
    NoOutput {
        file: PathBuf,
        status: String,
        stderr: String,
    },

    /// The built-in search path probe failed
    #[error("Failed to probe system search paths with '{program}': {reason}")]
    ProbeFailed { program: String, reason: String },
}

impl ToolchainError {
    /// Check if this error only affects a single source file
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ToolchainError::NoOutput { .. })
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Source root could not be resolved
    #[error("Invalid source root '{path}': {reason}")]
    InvalidSourceRoot { path: PathBuf, reason: String },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// An extension list parsed to nothing
    #[error("Extension list for {kind} files is empty")]
    EmptyExtensions { kind: &'static str },
}

/// Worker pool errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker thread could not be started
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// The pool no longer accepts tasks
    #[error("Worker pool is shut down")]
    PoolClosed,
}

/// Result type alias for FinderError
pub type Result<T> = std::result::Result<T, FinderError>;

/// Result type alias for IndexError
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Result type alias for ToolchainError
pub type ToolchainResult<T> = std::result::Result<T, ToolchainError>;

/// Represents the outcome of resolving a single source file in one round
#[derive(Debug)]
pub enum ResolveOutcome {
    /// The toolchain listed the file's headers and they were looked up
    Resolved {
        path: PathBuf,
        headers: usize,
        misses: usize,
        new_dirs: usize,
    },

    /// The toolchain failed for this file; it is dropped from later rounds
    Failed { path: PathBuf, error: ToolchainError },
}

impl ResolveOutcome {
    /// Returns true if the file taught us at least one new directory and
    /// must be visited again next round
    pub fn requeue(&self) -> bool {
        matches!(self, ResolveOutcome::Resolved { new_dirs, .. } if *new_dirs > 0)
    }

    /// Returns the path associated with this outcome
    pub fn path(&self) -> &PathBuf {
        match self {
            ResolveOutcome::Resolved { path, .. } => path,
            ResolveOutcome::Failed { path, .. } => path,
        }
    }
}
