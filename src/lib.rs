//! include-finder - Include Search Path Discovery
//!
//! Finds, for a tree of C/C++ sources, a set of include directories that
//! lets the compiler resolve every header those sources pull in, across any
//! number of independently rooted header trees. The output is a list of
//! `-I` flags for editor tooling (`.clang_complete`, code completion,
//! static analysis) when no build description is available.
//!
//! # Features
//!
//! - **Suffix Index**: Header trees are indexed once into name-keyed links
//!   running from each file toward its ancestors, so `sys/types.h` resolves
//!   in time proportional to its depth, not to the size of the trees.
//!
//! - **Parallel Resolution**: A bounded worker pool runs the compiler in
//!   dependency-listing mode over many files at once.
//!
//! - **Fixed-Point Rounds**: Files that taught us a new directory are
//!   revisited with the richer search path until nothing new turns up.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │    Header roots      │     │     Source root      │
//! └──────────┬───────────┘     └──────────┬───────────┘
//!            │ one thread per root        │ collect_sources
//!            ▼                            ▼
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │     HeaderIndex      │     │    pending files     │
//! │  (read-only forest)  │     └──────────┬───────────┘
//! └──────────┬───────────┘                │ batch of N
//!            │                            ▼
//!            │        ┌─────────────────────────────────────┐
//!            │        │            WorkerPool (N)           │
//!            │        │  cc -M -MG <hints> file → headers   │
//!            └───────▶│  HeaderIndex::search(header)        │
//!                     └──────────────────┬──────────────────┘
//!                                        │ new dirs? requeue
//!                                        ▼
//!                     ┌─────────────────────────────────────┐
//!                     │  DirectorySet (mutex, dedup, hints) │
//!                     └──────────────────┬──────────────────┘
//!                                        ▼
//!                               -I flags, sorted
//! ```
//!
//! # Example
//!
//! ```bash
//! # Index two header trees, write .clang_complete
//! include-finder -s /opt/sdk/include -s third_party src/
//!
//! # Print to stdout, forward defines to the compiler
//! include-finder -s include -x -DLINUX -o - .
//! ```

pub mod collect;
pub mod config;
pub mod dirset;
pub mod error;
pub mod index;
pub mod pool;
pub mod progress;
pub mod resolver;
pub mod toolchain;

pub use config::{CliArgs, ExtensionSet, FinderConfig, OutputTarget};
pub use dirset::DirectorySet;
pub use error::{FinderError, Result};
pub use index::HeaderIndex;
pub use pool::WorkerPool;
pub use resolver::{ResolveResult, Resolver};
pub use toolchain::{CompilerToolchain, HeaderListProvider, SystemSearchPathProvider};
