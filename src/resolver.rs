//! Resolver - drives every source file to a fixed point
//!
//! Each round takes up to `capacity` files off the front of the pending
//! list, resolves them on the worker pool and waits for the whole batch.
//! A file goes back to the front of the list only if it added at least one
//! directory nobody knew before. The index can only ever report finitely
//! many directories, so the loop always drains.
//!
//! `WorkerPool::wait` is the round barrier: every directory found in round
//! `i` is in the `DirectorySet` before any file of round `i + 1` asks for
//! its search hints.

use crate::dirset::DirectorySet;
use crate::error::{ResolveOutcome, Result};
use crate::index::HeaderIndex;
use crate::pool::WorkerPool;
use crate::toolchain::{is_known_location, HeaderListProvider};
use crossbeam_channel::unbounded;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Result of a completed resolution run
#[derive(Debug, Clone, Default)]
pub struct ResolveResult {
    /// Rounds dispatched
    pub rounds: u64,

    /// Source files handed in
    pub files: u64,

    /// Successful per-file resolutions, across all rounds
    pub resolutions: u64,

    /// Files dropped after a toolchain failure
    pub dropped: u64,

    /// Header lookups that found nothing
    pub misses: u64,

    /// Directories discovered
    pub directories: usize,

    /// Time spent resolving
    pub duration: Duration,

    /// Whether the run drained (vs was interrupted)
    pub completed: bool,
}

/// Progress information after each round
#[derive(Debug, Clone)]
pub struct RoundProgress {
    pub round: u64,
    pub dispatched: usize,
    pub requeued: usize,
    pub pending: usize,
    pub directories: usize,
    pub dropped: u64,
    pub elapsed: Duration,
}

/// Orchestrates the iterative, concurrent pass over all source files
pub struct Resolver {
    index: Arc<HeaderIndex>,
    dirs: Arc<DirectorySet>,
    provider: Arc<dyn HeaderListProvider>,
    capacity: usize,
    shutdown: Arc<AtomicBool>,
}

impl Resolver {
    pub fn new(
        index: Arc<HeaderIndex>,
        dirs: Arc<DirectorySet>,
        provider: Arc<dyn HeaderListProvider>,
        capacity: usize,
    ) -> Self {
        Self {
            index,
            dirs,
            provider,
            capacity: capacity.max(1),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// The shared directory accumulator
    pub fn directories(&self) -> &Arc<DirectorySet> {
        &self.dirs
    }

    /// Resolve `sources` until no file learns anything new
    pub fn run(&self, sources: Vec<PathBuf>) -> Result<ResolveResult> {
        self.run_with_progress(sources, |_| {})
    }

    /// Like `run`, calling `on_round` after every round
    pub fn run_with_progress<F>(
        &self,
        sources: Vec<PathBuf>,
        mut on_round: F,
    ) -> Result<ResolveResult>
    where
        F: FnMut(&RoundProgress),
    {
        let start = Instant::now();
        let pool = WorkerPool::new(self.capacity)?;
        let (outcome_tx, outcome_rx) = unbounded::<ResolveOutcome>();

        let mut result = ResolveResult {
            files: sources.len() as u64,
            completed: true,
            ..Default::default()
        };
        let mut pending: VecDeque<PathBuf> = sources.into();

        info!(
            files = pending.len(),
            workers = self.capacity,
            roots = self.index.root_count(),
            "Starting resolution"
        );

        while !pending.is_empty() {
            if self.shutdown.load(Ordering::Relaxed) {
                info!(pending = pending.len(), "Shutdown signal received");
                result.completed = false;
                break;
            }

            result.rounds += 1;
            let take = self.capacity.min(pending.len());
            let batch: Vec<PathBuf> = pending.drain(..take).collect();

            for file in &batch {
                debug!(round = result.rounds, file = %file.display(), "Dispatching");

                let file = file.clone();
                let index = Arc::clone(&self.index);
                let dirs = Arc::clone(&self.dirs);
                let provider = Arc::clone(&self.provider);
                let tx = outcome_tx.clone();

                pool.run(move || {
                    let outcome = resolve_one(&file, &index, &dirs, provider.as_ref());
                    let _ = tx.send(outcome);
                })?;
            }
            pool.wait();

            let mut learned = HashSet::new();
            let mut received = 0;
            for outcome in outcome_rx.try_iter() {
                received += 1;
                match &outcome {
                    ResolveOutcome::Resolved {
                        path,
                        headers,
                        misses,
                        new_dirs,
                    } => {
                        result.resolutions += 1;
                        result.misses += *misses as u64;
                        debug!(
                            file = %path.display(),
                            headers = headers,
                            misses = misses,
                            new_dirs = new_dirs,
                            "File resolved"
                        );
                    }
                    ResolveOutcome::Failed { path, error } if error.is_recoverable() => {
                        result.dropped += 1;
                        warn!(file = %path.display(), error = %error, "Dropping file");
                    }
                    ResolveOutcome::Failed { path, error } => {
                        result.dropped += 1;
                        error!(
                            file = %path.display(),
                            error = %error,
                            "Toolchain unusable, dropping file"
                        );
                    }
                }
                if outcome.requeue() {
                    learned.insert(outcome.path().clone());
                }
            }

            // A task that panicked sends nothing; its file is dropped too
            let lost = batch.len() - received;
            if lost > 0 {
                warn!(lost = lost, "Tasks ended without an outcome");
                result.dropped += lost as u64;
            }

            let requeued: Vec<PathBuf> =
                batch.into_iter().filter(|f| learned.contains(f)).collect();
            let requeued_count = requeued.len();
            for file in requeued.into_iter().rev() {
                pending.push_front(file);
            }

            on_round(&RoundProgress {
                round: result.rounds,
                dispatched: take,
                requeued: requeued_count,
                pending: pending.len(),
                directories: self.dirs.len(),
                dropped: result.dropped,
                elapsed: start.elapsed(),
            });
        }

        result.directories = self.dirs.len();
        result.duration = start.elapsed();

        info!(
            rounds = result.rounds,
            resolutions = result.resolutions,
            dropped = result.dropped,
            misses = result.misses,
            directories = result.directories,
            duration_ms = result.duration.as_millis() as u64,
            "Resolution finished"
        );

        Ok(result)
    }
}

/// Resolve one file: list its headers with the current hints and feed every
/// index hit into the directory set
pub fn resolve_one(
    file: &Path,
    index: &HeaderIndex,
    dirs: &DirectorySet,
    provider: &dyn HeaderListProvider,
) -> ResolveOutcome {
    let hints = dirs.snapshot();
    let headers = match provider.list_headers(file, &hints) {
        Ok(headers) => headers,
        Err(error) => {
            return ResolveOutcome::Failed {
                path: file.to_path_buf(),
                error,
            }
        }
    };

    let mut misses = 0;
    let mut new_dirs = 0;
    for header in &headers {
        if is_known_location(header, dirs.system()) {
            continue;
        }
        match index.search(header) {
            Ok(found) => new_dirs += dirs.add(&found),
            Err(e) if e.is_not_found() => {
                misses += 1;
                warn!(file = %file.display(), header = %header, "{}", e);
            }
            Err(e) => {
                misses += 1;
                error!(file = %file.display(), header = %header, error = %e, "Lookup failed");
            }
        }
    }

    ResolveOutcome::Resolved {
        path: file.to_path_buf(),
        headers: headers.len(),
        misses,
        new_dirs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionSet;
    use crate::error::{ToolchainError, ToolchainResult};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::fs::{self, File};
    use tempfile::tempdir;

    /// Canned header lists; a header tagged `needs:<flag>` is only listed
    /// once that flag is among the hints
    #[derive(Default)]
    struct FakeProvider {
        headers: HashMap<PathBuf, Vec<String>>,
        failing: HashSet<PathBuf>,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl FakeProvider {
        fn with(mut self, file: &str, headers: &[&str]) -> Self {
            self.headers.insert(
                PathBuf::from(file),
                headers.iter().map(|h| h.to_string()).collect(),
            );
            self
        }

        fn failing(mut self, file: &str) -> Self {
            self.failing.insert(PathBuf::from(file));
            self
        }

        fn calls_for(&self, file: &str) -> usize {
            self.calls.lock().iter().filter(|p| p.as_path() == Path::new(file)).count()
        }
    }

    impl HeaderListProvider for FakeProvider {
        fn list_headers(&self, file: &Path, hints: &[String]) -> ToolchainResult<Vec<String>> {
            self.calls.lock().push(file.to_path_buf());
            if self.failing.contains(file) {
                return Err(ToolchainError::NoOutput {
                    file: file.to_path_buf(),
                    status: "exit status: 1".into(),
                    stderr: "fatal error".into(),
                });
            }
            let listed = self.headers.get(file).cloned().unwrap_or_default();
            Ok(listed
                .into_iter()
                .filter_map(|h| match h.split_once(" needs:") {
                    Some((header, flag)) => {
                        hints.iter().any(|x| x == flag).then(|| header.to_string())
                    }
                    None => Some(h),
                })
                .collect())
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    fn resolver(
        roots: &[PathBuf],
        provider: FakeProvider,
        capacity: usize,
    ) -> (Resolver, Arc<FakeProvider>) {
        let (index, failures) = HeaderIndex::build_all(roots, &ExtensionSet::parse(".h .hpp"));
        assert!(failures.is_empty());
        let provider = Arc::new(provider);
        let resolver = Resolver::new(
            Arc::new(index),
            Arc::new(DirectorySet::new()),
            provider.clone(),
            capacity,
        );
        (resolver, provider)
    }

    #[test]
    fn test_single_header_scenario() {
        let dir = tempdir().unwrap();
        let hdr1 = dir.path().join("hdr1");
        touch(&hdr1, "sys/types.h");

        let provider = FakeProvider::default().with("main.c", &["sys/types.h"]);
        let (resolver, provider) = resolver(&[hdr1.clone()], provider, 2);
        let result = resolver.run(vec![PathBuf::from("main.c")]).unwrap();

        assert!(result.completed);
        assert_eq!(resolver.directories().flags(), vec![format!("-I{}", hdr1.display())]);
        // Learned something in round 1, nothing new in round 2
        assert_eq!(result.rounds, 2);
        assert_eq!(provider.calls_for("main.c"), 2);
        assert_eq!(result.misses, 0);
    }

    #[test]
    fn test_known_headers_do_not_requeue() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "inc/a.h");

        let provider = FakeProvider::default()
            .with("one.c", &["a.h"])
            .with("two.c", &["a.h"]);
        let (resolver, provider) = resolver(&[dir.path().to_path_buf()], provider, 1);
        let result = resolver
            .run(vec![PathBuf::from("one.c"), PathBuf::from("two.c")])
            .unwrap();

        // one.c learns inc/ and is revisited; two.c finds only known dirs
        assert_eq!(provider.calls_for("one.c"), 2);
        assert_eq!(provider.calls_for("two.c"), 1);
        assert_eq!(result.directories, 1);
        assert_eq!(result.rounds, 3);
    }

    #[test]
    fn test_hints_unlock_more_headers() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "base/api.h");
        touch(dir.path(), "extra/deep/impl.h");

        let base_flag = format!("-I{}", dir.path().join("base").display());
        let gated = format!("deep/impl.h needs:{}", base_flag);
        let provider = FakeProvider::default().with("main.c", &["api.h", gated.as_str()]);
        let (resolver, provider) = resolver(&[dir.path().to_path_buf()], provider, 4);
        let result = resolver.run(vec![PathBuf::from("main.c")]).unwrap();

        assert_eq!(
            resolver.directories().discovered(),
            vec![dir.path().join("base"), dir.path().join("extra")]
        );
        // learn base, learn extra, nothing new
        assert_eq!(provider.calls_for("main.c"), 3);
        assert_eq!(result.rounds, 3);
    }

    #[test]
    fn test_ambiguous_header_adds_every_candidate() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left");
        let right = dir.path().join("right");
        touch(&left, "util.h");
        touch(&right, "a/b/util.h");

        let provider = FakeProvider::default().with("main.c", &["util.h"]);
        let (resolver, _) = resolver(&[left.clone(), right.clone()], provider, 2);
        resolver.run(vec![PathBuf::from("main.c")]).unwrap();

        assert_eq!(resolver.directories().discovered(), vec![left, right.join("a/b")]);
    }

    #[test]
    fn test_absolute_headers_are_not_looked_up() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "inc/a.h");

        let provider = FakeProvider::default().with("main.c", &["/usr/include/stdio.h", "a.h"]);
        let (resolver, _) = resolver(&[dir.path().to_path_buf()], provider, 2);
        let result = resolver.run(vec![PathBuf::from("main.c")]).unwrap();

        assert_eq!(result.misses, 0);
        assert_eq!(resolver.directories().discovered(), vec![dir.path().join("inc")]);
    }

    #[test]
    fn test_misses_are_not_fatal() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "inc/a.h");

        let provider = FakeProvider::default().with("main.c", &["missing/x.h", "a.h", "nope.h"]);
        let (resolver, _) = resolver(&[dir.path().to_path_buf()], provider, 2);
        let result = resolver.run(vec![PathBuf::from("main.c")]).unwrap();

        assert!(result.completed);
        // Two misses in each of the two rounds
        assert_eq!(result.misses, 4);
        assert_eq!(result.directories, 1);
    }

    #[test]
    fn test_failing_file_is_dropped() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "inc/a.h");

        let provider = FakeProvider::default()
            .with("good.c", &["a.h"])
            .failing("bad.c");
        let (resolver, provider) = resolver(&[dir.path().to_path_buf()], provider, 2);
        let result = resolver
            .run(vec![PathBuf::from("bad.c"), PathBuf::from("good.c")])
            .unwrap();

        assert!(result.completed);
        assert_eq!(result.dropped, 1);
        assert_eq!(provider.calls_for("bad.c"), 1);
        assert_eq!(result.directories, 1);
    }

    #[test]
    fn test_empty_forest_terminates() {
        let provider = FakeProvider::default().with("main.c", &["sys/types.h"]);
        let (resolver, provider) = resolver(&[], provider, 2);
        let result = resolver.run(vec![PathBuf::from("main.c")]).unwrap();

        assert_eq!(result.rounds, 1);
        assert_eq!(result.misses, 1);
        assert_eq!(provider.calls_for("main.c"), 1);
        assert!(resolver.directories().is_empty());
    }

    #[test]
    fn test_rounds_are_bounded_by_capacity() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "inc/a.h");

        let mut provider = FakeProvider::default();
        let files: Vec<PathBuf> = (0..10).map(|i| PathBuf::from(format!("f{}.c", i))).collect();
        for file in &files {
            provider = provider.with(file.to_str().unwrap(), &[]);
        }
        let (resolver, _) = resolver(&[dir.path().to_path_buf()], provider, 3);

        let mut dispatched = Vec::new();
        let result = resolver
            .run_with_progress(files, |p| dispatched.push(p.dispatched))
            .unwrap();

        assert_eq!(dispatched, vec![3, 3, 3, 1]);
        assert_eq!(result.rounds, 4);
        assert_eq!(result.resolutions, 10);
    }

    #[test]
    fn test_directory_set_never_shrinks() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a/x.h");
        touch(dir.path(), "b/y.h");

        let provider = FakeProvider::default()
            .with("one.c", &["x.h"])
            .with("two.c", &["y.h"]);
        let (resolver, _) = resolver(&[dir.path().to_path_buf()], provider, 1);

        let mut sizes = Vec::new();
        resolver
            .run_with_progress(vec![PathBuf::from("one.c"), PathBuf::from("two.c")], |p| {
                sizes.push(p.directories)
            })
            .unwrap();

        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(sizes.last(), Some(&2));
    }

    #[test]
    fn test_shutdown_stops_dispatch() {
        let provider = FakeProvider::default().with("main.c", &[]);
        let (resolver, provider) = resolver(&[], provider, 1);
        resolver.shutdown_flag().store(true, Ordering::SeqCst);

        let result = resolver.run(vec![PathBuf::from("main.c")]).unwrap();
        assert!(!result.completed);
        assert_eq!(result.rounds, 0);
        assert_eq!(provider.calls_for("main.c"), 0);
    }
}
