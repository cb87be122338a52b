//! Shared accumulator of discovered include directories
//!
//! Workers add directories concurrently; every mutation goes through one
//! mutex. The toolchain's built-in directories are held apart: they seed the
//! search hints and are appended to the output in the order the toolchain
//! reported them, after the sorted discovered directories.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    known: HashSet<PathBuf>,
    ordered: Vec<PathBuf>,
}

/// Thread-safe, deduplicated, insertion-ordered set of include directories
#[derive(Debug, Default)]
pub struct DirectorySet {
    inner: Mutex<Inner>,

    /// Toolchain built-in directories, in toolchain order
    system: Vec<PathBuf>,

    /// Emit `system` at the end of `flush`
    emit_system: bool,
}

impl DirectorySet {
    /// Create an empty set with no system directories
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set seeded with the toolchain's built-in directories
    pub fn with_system(system: Vec<PathBuf>, emit_system: bool) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            system,
            emit_system,
        }
    }

    /// Record every directory not seen before; returns how many were new
    pub fn add<P: AsRef<Path>>(&self, dirs: &[P]) -> usize {
        let mut inner = self.inner.lock();
        let mut added = 0;
        for dir in dirs {
            let dir = dir.as_ref();
            if self.system.iter().any(|s| s == dir) || inner.known.contains(dir) {
                continue;
            }
            debug!(dir = %dir.display(), "New include directory");
            inner.known.insert(dir.to_path_buf());
            inner.ordered.push(dir.to_path_buf());
            added += 1;
        }
        added
    }

    /// Current directories as `-I` flags: discovered ones in insertion
    /// order, then the system ones
    pub fn snapshot(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner
            .ordered
            .iter()
            .chain(self.system.iter())
            .map(|dir| include_flag(dir))
            .collect()
    }

    /// Discovered directories, sorted
    pub fn discovered(&self) -> Vec<PathBuf> {
        let mut dirs = self.inner.lock().ordered.clone();
        dirs.sort();
        dirs
    }

    /// Toolchain built-in directories
    pub fn system(&self) -> &[PathBuf] {
        &self.system
    }

    /// Number of discovered directories
    pub fn len(&self) -> usize {
        self.inner.lock().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every line `flush` would write, in order
    pub fn flags(&self) -> Vec<String> {
        let mut flags: Vec<String> = self.discovered().iter().map(|d| include_flag(d)).collect();
        if self.emit_system {
            flags.extend(self.system.iter().map(|d| include_flag(d)));
        }
        flags
    }

    /// Write one `-I<dir>` line per directory
    pub fn flush<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for flag in self.flags() {
            writeln!(writer, "{}", flag)?;
        }
        writer.flush()
    }
}

fn include_flag(dir: &Path) -> String {
    format!("-I{}", dir.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_add_is_idempotent() {
        let set = DirectorySet::new();
        assert_eq!(set.add(&["/a", "/b"]), 2);
        assert_eq!(set.add(&["/a"]), 0);
        assert_eq!(set.add(&["/b", "/c", "/c"]), 1);
        assert_eq!(set.len(), 3);
        assert_eq!(set.snapshot(), vec!["-I/a", "-I/b", "-I/c"]);
    }

    #[test]
    fn test_system_dirs_are_not_rediscovered() {
        let set = DirectorySet::with_system(vec![PathBuf::from("/usr/include")], true);
        assert_eq!(set.add(&["/usr/include"]), 0);
        assert!(set.is_empty());
        assert_eq!(set.snapshot(), vec!["-I/usr/include"]);
    }

    #[test]
    fn test_flush_sorts_discovered_then_system() {
        let set = DirectorySet::with_system(
            vec![PathBuf::from("/usr/local/include"), PathBuf::from("/usr/include")],
            true,
        );
        set.add(&["/src/zeta", "/src/alpha", "/src/mid"]);

        let mut out = Vec::new();
        set.flush(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "-I/src/alpha\n-I/src/mid\n-I/src/zeta\n-I/usr/local/include\n-I/usr/include\n"
        );
    }

    #[test]
    fn test_flush_without_system() {
        let set = DirectorySet::with_system(vec![PathBuf::from("/usr/include")], false);
        set.add(&["/b", "/a"]);
        assert_eq!(set.flags(), vec!["-I/a", "-I/b"]);
        // Still offered as hints
        assert!(set.snapshot().contains(&"-I/usr/include".to_string()));
    }

    #[test]
    fn test_concurrent_add() {
        let set = Arc::new(DirectorySet::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let set = Arc::clone(&set);
                thread::spawn(move || {
                    let dirs: Vec<PathBuf> =
                        (0..100).map(|i| PathBuf::from(format!("/d/{}", (i + t) % 50))).collect();
                    set.add(&dirs)
                })
            })
            .collect();

        let added: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(added, 50);
        assert_eq!(set.len(), 50);

        let snapshot = set.snapshot();
        let unique: HashSet<_> = snapshot.iter().collect();
        assert_eq!(unique.len(), snapshot.len());
    }
}
