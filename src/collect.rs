//! Source file collection
//!
//! Depth-first walk of the source root in name order. Dot-prefixed entries
//! are skipped along with everything beneath them; the root itself is always
//! walked. An unreadable root is an error, an unreadable entry below it is
//! logged and skipped.

use crate::config::ExtensionSet;
use crate::error::Result;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.len() > 1 && name.starts_with('.'))
            .unwrap_or(false)
}

/// Collect every file under `root` whose extension is accepted
pub fn collect_sources(root: &Path, exts: &ExtensionSet) -> Result<Vec<PathBuf>> {
    let root = std::path::absolute(root)?;
    let mut sources = Vec::new();

    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(io::Error::from(e).into()),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable source entry");
                continue;
            }
        };

        if entry.file_type().is_dir() || !exts.matches(entry.path()) {
            continue;
        }
        sources.push(entry.into_path());
    }

    debug!(root = %root.display(), files = sources.len(), "Source files collected");
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    #[test]
    fn test_collect_filters_and_orders() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "src/b.cc");
        touch(dir.path(), "src/a.c");
        touch(dir.path(), "src/a.h");
        touch(dir.path(), "lib/z.cpp");
        touch(dir.path(), "notes.txt");

        let sources = collect_sources(dir.path(), &ExtensionSet::parse(".c .cc .cpp")).unwrap();
        assert_eq!(
            sources,
            vec![
                dir.path().join("lib/z.cpp"),
                dir.path().join("src/a.c"),
                dir.path().join("src/b.cc"),
            ]
        );
    }

    #[test]
    fn test_collect_skips_hidden_subtrees() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "main.c");
        touch(dir.path(), ".git/hooks/x.c");
        touch(dir.path(), "src/.cache/gen.c");
        touch(dir.path(), "src/.scratch.c");

        let sources = collect_sources(dir.path(), &ExtensionSet::parse(".c")).unwrap();
        assert_eq!(sources, vec![dir.path().join("main.c")]);
    }

    #[test]
    fn test_collect_missing_root_fails() {
        let dir = tempdir().unwrap();
        assert!(collect_sources(&dir.path().join("absent"), &ExtensionSet::parse(".c")).is_err());
    }
}
