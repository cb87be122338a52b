//! Benchmarks for include-finder
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use include_finder::{DirectorySet, ExtensionSet, HeaderIndex};
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;

/// 8 top-level dirs x 8 subdirs x 16 headers
fn header_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for a in 0..8 {
        for b in 0..8 {
            let sub = dir.path().join(format!("lib{}", a)).join(format!("mod{}", b));
            fs::create_dir_all(&sub).unwrap();
            for h in 0..16 {
                File::create(sub.join(format!("h{}.h", h))).unwrap();
            }
        }
    }
    dir
}

fn benchmark_index_build(c: &mut Criterion) {
    let tree = header_tree();
    let exts = ExtensionSet::parse(".h .hpp");

    c.bench_function("index_build_1024_headers", |b| {
        b.iter(|| {
            let (index, _) = HeaderIndex::build_all(&[tree.path().to_path_buf()], &exts);
            black_box(index);
        })
    });
}

fn benchmark_index_search(c: &mut Criterion) {
    let tree = header_tree();
    let exts = ExtensionSet::parse(".h");
    let (index, _) = HeaderIndex::build_all(&[tree.path().to_path_buf()], &exts);

    c.bench_function("search_qualified", |b| {
        b.iter(|| black_box(index.search(black_box("mod3/h7.h"))))
    });

    // Every mod directory holds h7.h
    c.bench_function("search_ambiguous", |b| {
        b.iter(|| black_box(index.search(black_box("h7.h"))))
    });

    c.bench_function("search_miss", |b| {
        b.iter(|| black_box(index.search(black_box("nope/h7.h"))))
    });
}

fn benchmark_dirset_add(c: &mut Criterion) {
    let dirs: Vec<_> = (0..64).map(|i| Path::new("/inc").join(format!("d{}", i))).collect();

    c.bench_function("dirset_add_known", |b| {
        let set = DirectorySet::new();
        set.add(&dirs);
        b.iter(|| black_box(set.add(black_box(&dirs))))
    });
}

criterion_group!(benches, benchmark_index_build, benchmark_index_search, benchmark_dirset_add);
criterion_main!(benches);
