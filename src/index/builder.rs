//! Header root scanning
//!
//! A root is scanned depth first on a single thread. Children are visited
//! before their directory node is allocated, so a directory that retains
//! nothing never enters the arena.

use crate::config::ExtensionSet;
use crate::error::{IndexError, IndexResult};
use crate::index::node::{NodeId, RootIndex};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Scan `root` and build its arena
///
/// The root is canonicalized first: a symlinked root is followed and `..`
/// segments never reach the emitted directories.
pub fn build_root(root: &Path, exts: &ExtensionSet) -> IndexResult<RootIndex> {
    let root = fs::canonicalize(root).map_err(|e| IndexError::RootUnreadable {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let meta = fs::metadata(&root).map_err(|e| IndexError::RootUnreadable {
        path: root.clone(),
        reason: e.to_string(),
    })?;
    if !meta.is_dir() {
        return Err(IndexError::RootUnreadable {
            path: root,
            reason: "not a directory".into(),
        });
    }

    let mut index = RootIndex::new(root.clone());
    let mut scanner = Scanner {
        index: &mut index,
        exts,
        dirs_scanned: 0,
    };

    // A root that retains nothing still registers, with nothing under it
    let top = scanner.visit(&root, true)?;
    let dirs_scanned = scanner.dirs_scanned;

    debug!(
        root = %root.display(),
        dirs = dirs_scanned,
        files = index.file_count(),
        empty = top.is_none(),
        "Header root indexed"
    );

    Ok(index)
}

struct Scanner<'a> {
    index: &'a mut RootIndex,
    exts: &'a ExtensionSet,
    dirs_scanned: u64,
}

impl Scanner<'_> {
    /// Visit one entry; `None` means the entry is skipped
    fn visit(&mut self, path: &Path, is_root: bool) -> IndexResult<Option<NodeId>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // The root is scanned even when its own name is dotted
        if !is_root && name.starts_with('.') {
            return Ok(None);
        }
        let parent = path.parent().unwrap_or(Path::new(""));

        let meta = fs::symlink_metadata(path).map_err(|e| IndexError::StatFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let file_type = meta.file_type();

        if file_type.is_file() {
            if !self.exts.matches(path) {
                return Ok(None);
            }
            let id = self.index.alloc(&name, parent);
            self.index.register_file(id);
            trace!(path = %path.display(), "Indexed header");
            return Ok(Some(id));
        }

        // Symlinks, sockets, devices
        if !file_type.is_dir() {
            return Ok(None);
        }

        self.dirs_scanned += 1;
        trace!(path = %path.display(), "Scanning directory");

        let mut children = fs::read_dir(path)
            .map_err(|e| IndexError::ReadDirFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<PathBuf>>>()
            .map_err(|e| IndexError::ReadDirFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        children.sort();

        let mut retained = Vec::new();
        for child in &children {
            if let Some(id) = self.visit(child, false)? {
                retained.push(id);
            }
        }

        if retained.is_empty() {
            return Ok(None);
        }

        let dir = self.index.alloc(&name, parent);
        let key: Box<str> = name.into();
        for child in retained {
            self.index.link(child, key.clone(), dir);
        }
        Ok(Some(dir))
    }
}
