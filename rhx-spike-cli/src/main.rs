//! Intan RHX spike file decoder CLI application.
//!
//! Decodes spike.dat files and optionally exports spike times and snapshots to CSV.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use rhx_spike_core::{output, SpikeDataset, SpikeDecoder};
use std::path::PathBuf;
use std::time::Instant;

/// Intan RHX spike data file decoder.
///
/// Decodes spike files saved by the RHX acquisition software and prints a
/// per-channel summary. Spike times and snapshots can be exported to CSV.
#[derive(Parser, Debug)]
#[command(name = "rhx-spikes")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input spike data file path
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Ignore spikes flagged as likely artifacts (spike ID 128)
    #[arg(long)]
    no_artifacts: bool,

    /// Channel index that records of a single-channel file are assigned to
    #[arg(long, value_name = "INDEX", default_value_t = 1)]
    single_channel_index: usize,

    /// Write spike times to this CSV file
    ///
    /// Columns: native_name, custom_name, timestamp_s, spike_id
    #[arg(short, long, value_name = "PATH")]
    spikes: Option<PathBuf>,

    /// Write spike snapshots (in microvolts) to this CSV file
    ///
    /// The first row holds the snapshot time axis in seconds.
    #[arg(long, value_name = "PATH")]
    snapshots: Option<PathBuf>,

    /// Suppress progress and summary output
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.quiet {
        LevelFilter::Warn
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .parse_default_env()
        .init();

    // Setup progress spinner
    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb
    };

    let start_time = Instant::now();

    progress.set_message(format!(
        "Decoding {:?}...",
        args.input.file_name().unwrap_or_default()
    ));

    let decoder = SpikeDecoder::new()
        .exclude_artifacts(args.no_artifacts)
        .single_channel_index(args.single_channel_index);
    let dataset = decoder
        .decode_file(&args.input)
        .with_context(|| format!("Failed to decode spike file {:?}", args.input))?;

    if let Some(path) = &args.spikes {
        progress.set_message(format!(
            "Writing spike times to {:?}...",
            path.file_name().unwrap_or_default()
        ));
        output::write_spike_csv(path, &dataset).context("Failed to write spike CSV")?;
        info!("Wrote {} spike times to {:?}", dataset.total_spikes(), path);
    }

    if let Some(path) = &args.snapshots {
        if dataset.snapshot_time_axis.is_some() {
            progress.set_message(format!(
                "Writing snapshots to {:?}...",
                path.file_name().unwrap_or_default()
            ));
            output::write_snapshot_csv(path, &dataset).context("Failed to write snapshot CSV")?;
            info!("Wrote snapshots to {:?}", path);
        } else {
            warn!("File contains no snapshots; {:?} not written", path);
        }
    }

    let total_duration = start_time.elapsed();

    progress.finish_with_message(format!(
        "Done! Decoded {} spikes in {:.2}s",
        dataset.total_spikes(),
        total_duration.as_secs_f64()
    ));

    if !args.quiet {
        print_summary(&args, &dataset, total_duration.as_secs_f64());
    }

    Ok(())
}

fn print_summary(args: &Args, dataset: &SpikeDataset, seconds: f64) {
    let header = &dataset.header;

    eprintln!();
    eprintln!("Summary:");
    eprintln!("  Input:        {:?}", args.input);
    eprintln!("  Source:       {}", header.source_file_name);
    eprintln!("  Format:       {:?} (version {})", header.format, header.version);
    eprintln!("  Sample rate:  {} Hz", header.sample_rate_hz);
    if header.snapshots_present() {
        eprintln!(
            "  Snapshots:    {} samples ({} pre, {} post)",
            header.n_samples(),
            header.samples_pre_detect,
            header.samples_post_detect
        );
    } else {
        eprintln!("  Snapshots:    none");
    }
    eprintln!("  Spikes:       {}", dataset.total_spikes());
    if !dataset.warnings.is_empty() {
        eprintln!("  Warnings:     {}", dataset.warnings.len());
    }
    if args.no_artifacts {
        eprintln!("  Artifacts:    excluded");
    } else {
        eprintln!("  Artifacts:    {}", dataset.artifact_count());
    }
    eprintln!("  Duration:     {:.3}s", seconds);
    eprintln!();
    eprintln!("  {:<8} {:<16} {:>10}", "Native", "Custom", "Spikes");
    for chan in &dataset.channels {
        eprintln!(
            "  {:<8} {:<16} {:>10}",
            chan.channel.native_name,
            chan.channel.custom_name,
            chan.spikes.len()
        );
    }
}
