//! Header index
//!
//! A forest of per-root arenas answering one question: from which
//! directories does a relative header path such as `sys/types.h` resolve?
//!
//! # Architecture
//!
//! ```text
//!   sentinel(root A)            sentinel(root B)
//!     │ "types.h"                 │ "types.h"
//!     ▼                           ▼
//!   types.h ──"sys"──▶ sys      types.h ──"linux"──▶ linux ──"include"──▶ include
//!   (A/sys)            (A)      (B/include/linux)    (B/include)          (B)
//! ```
//!
//! Lookups walk the path segments from the file name backwards, following
//! the name-keyed links toward the root. Each root is built on its own
//! thread into its own arena, so building needs no locks and the finished
//! index is read-only and `Sync`.

pub mod builder;
pub mod node;
pub mod search;

pub use node::{IndexNode, NodeId, RootIndex};

use crate::config::ExtensionSet;
use crate::error::{IndexError, IndexResult};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{error, info};

/// Read-only forest of scanned header roots
#[derive(Debug, Default)]
pub struct HeaderIndex {
    /// One arena per root, in registration order
    roots: Vec<RootIndex>,
}

impl HeaderIndex {
    /// Create an index with no roots; every search misses
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one header root and register it, replacing an earlier scan of
    /// the same path
    pub fn build(&mut self, root: &Path, exts: &ExtensionSet) -> IndexResult<()> {
        let index = builder::build_root(root, exts)?;
        self.register(index);
        Ok(())
    }

    /// Scan several roots in parallel, one thread per root
    ///
    /// A root that fails is left out and reported in the returned list; it
    /// never affects its siblings.
    pub fn build_all(roots: &[PathBuf], exts: &ExtensionSet) -> (Self, Vec<(PathBuf, IndexError)>) {
        let results: Vec<(PathBuf, IndexResult<RootIndex>)> = thread::scope(|scope| {
            let handles: Vec<_> = roots
                .iter()
                .map(|root| {
                    let handle = scope.spawn(move || builder::build_root(root, exts));
                    (root, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(root, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(IndexError::RootUnreadable {
                            path: root.clone(),
                            reason: "index builder panicked".into(),
                        })
                    });
                    (root.clone(), result)
                })
                .collect()
        });

        let mut index = Self::new();
        let mut failures = Vec::new();
        for (root, result) in results {
            match result {
                Ok(built) => {
                    info!(
                        root = %built.root().display(),
                        files = built.file_count(),
                        nodes = built.len(),
                        "Header root ready"
                    );
                    index.register(built);
                }
                Err(e) => {
                    error!(root = %root.display(), error = %e, "Header root failed");
                    failures.push((root, e));
                }
            }
        }

        (index, failures)
    }

    fn register(&mut self, built: RootIndex) {
        match self.roots.iter_mut().find(|r| r.root() == built.root()) {
            Some(existing) => *existing = built,
            None => self.roots.push(built),
        }
    }

    /// Registered roots, in registration order
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(|r| r.root())
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Total number of indexed header files across all roots
    pub fn file_count(&self) -> usize {
        self.roots.iter().map(RootIndex::file_count).sum()
    }

    pub(crate) fn arenas(&self) -> &[RootIndex] {
        &self.roots
    }
}
