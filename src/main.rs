use std::io;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{HumanBytes, HumanCount, ProgressBar, ProgressStyle};
use log::{LevelFilter, debug, info, warn};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use time::macros::format_description;

use match_file_dups::{
    Cli, FsOpener, HashCache, Matcher, Settings, TextSink, format_human_elapsed, list_files,
};

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut config = ConfigBuilder::new();
    config
        .add_filter_allow_str("match_file_dups")
        .set_time_format_custom(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        ));
    // Falls back to UTC when the local offset cannot be determined.
    let _ = config.set_time_offset_to_local();

    TermLogger::init(level, config.build(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialize logging")
}

fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();
    init_logging(&cli)?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    debug!("Command line arguments: {:?}", cli);

    let settings = Settings::resolve(&cli)?;
    debug!("Settings: {:?}", settings);

    let files = list_files(&settings.scan)?;

    let options = settings.matching;
    let mut cache = HashCache::new(options.algorithm, options.block_size);

    let progress = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ETA: {eta}")?
                .progress_chars("#>-"),
        );
        pb
    };

    let mut sink = TextSink::new(io::stdout().lock());
    let summary = Matcher::new(&files, FsOpener::new(options.block_size))
        .with_policy(options.policy)
        .with_progress(progress)
        .run(&mut cache, &mut sink)?;
    sink.flush().context("Failed to write to stdout")?;

    info!(
        "Found {} duplicate files among {} in {} groups wasting {}",
        HumanCount(summary.duplicates as u64),
        HumanCount(summary.files as u64),
        HumanCount(summary.groups as u64),
        HumanBytes(summary.duplicate_bytes)
    );
    debug!(
        "Compared {} pairs, hashed {} blocks, reused {} cached blocks",
        HumanCount(summary.pairs_compared as u64),
        HumanCount(summary.cache.hashes_computed),
        HumanCount(summary.cache.blocks_reused)
    );
    if summary.pairs_failed > 0 {
        warn!(
            "{} comparisons were skipped because a file could not be read",
            HumanCount(summary.pairs_failed as u64)
        );
    }

    info!("Completed in {}", format_human_elapsed(start_time.elapsed()));
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}
