//! include-finder - Include Search Path Discovery
//!
//! Entry point for the CLI application.

use anyhow::{bail, Context, Result};
use clap::Parser;
use include_finder::collect::collect_sources;
use include_finder::config::{CliArgs, FinderConfig, OutputTarget};
use include_finder::progress::{print_header, print_summary, ProgressReporter};
use include_finder::{
    CompilerToolchain, DirectorySet, HeaderIndex, Resolver, SystemSearchPathProvider,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose);

    // Validate and create config
    let config = FinderConfig::from_args(args).context("Invalid configuration")?;

    // Open the output first so a bad destination fails before any work
    let mut output = open_output(&config.output)?;

    if config.show_progress {
        print_header(
            &config.src_root.display().to_string(),
            config.search_roots.len(),
            config.worker_count,
            &config.output.display_name(),
        );
    }

    let toolchain = CompilerToolchain::new(
        config.cc.clone(),
        config.cc_flags.clone(),
        config.header_exts.clone(),
    );

    let system = match toolchain.system_search_paths() {
        Ok(dirs) => {
            info!(count = dirs.len(), "System include directories");
            dirs
        }
        Err(e) => {
            warn!(error = %e, "Continuing without system include directories");
            Vec::new()
        }
    };
    let dirs = Arc::new(DirectorySet::with_system(system, config.include_system));

    // Build the header index
    let index_start = Instant::now();
    let (index, failures) = HeaderIndex::build_all(&config.search_roots, &config.header_exts);
    let index_time = index_start.elapsed();
    if !config.search_roots.is_empty() && failures.len() == config.search_roots.len() {
        bail!("Every header root failed to index");
    }
    let indexed_files = index.file_count();

    // Enumerate sources
    let sources = collect_sources(&config.src_root, &config.source_exts)
        .with_context(|| format!("Failed to walk '{}'", config.src_root.display()))?;

    let resolver = Resolver::new(
        Arc::new(index),
        Arc::clone(&dirs),
        Arc::new(toolchain),
        config.worker_count,
    );

    // Setup signal handler for graceful shutdown
    let shutdown_flag = resolver.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing current round...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    // Create progress reporter
    let progress = if config.show_progress {
        Some(ProgressReporter::new())
    } else {
        None
    };

    if let Some(ref p) = progress {
        p.set_status("Resolving headers...");
    }

    let result = resolver
        .run_with_progress(sources, |round| {
            if let Some(ref p) = progress {
                p.update(round);
            }
        })
        .context("Resolution failed")?;

    if let Some(ref p) = progress {
        if result.completed {
            p.finish("Resolution completed");
        } else {
            p.finish("Resolution interrupted");
        }
    }

    // Best-effort output even when interrupted
    dirs.flush(&mut output).context("Failed to write output")?;

    if config.show_progress {
        print_summary(&result, indexed_files, index_time, &config.output.display_name());
    }

    if !result.completed {
        info!("Resolution was interrupted before completion");
    }

    Ok(())
}

fn open_output(target: &OutputTarget) -> Result<Box<dyn Write>> {
    match target {
        OutputTarget::Stdout => Ok(Box::new(BufWriter::new(io::stdout()))),
        OutputTarget::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output '{}'", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("include_finder=debug,warn")
    } else {
        EnvFilter::new("include_finder=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
