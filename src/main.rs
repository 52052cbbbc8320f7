// src/main.rs
//
// Precache runner: computes plan outputs for a set of tracks so playback
// never has to wait for feature extraction.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colorful::Colorful;
use std::path::Path;
use std::time::Instant;

use whirling::cli::{
    collect_audio_files, print_json, print_report, print_summary, Args, CliListener, RunSummary,
    TrackReport, TrackStatus,
};
use whirling::store::Store;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let tracks = collect_audio_files(&args.paths);
    if tracks.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }

    let pb = CliListener::progress_bar(tracks.len());
    let mut store = Store::builder()
        .config(args.pipeline_config())
        .listener(CliListener::new(pb.clone()))
        .build();
    store
        .initialize(&args.plan)
        .with_context(|| format!("Failed to load plan '{}'", args.plan))?;

    if !args.json {
        println!("Found {} audio file(s)\n", tracks.len());
    }

    let mut reports = Vec::with_capacity(tracks.len());
    for track in &tracks {
        let report = process_track(&mut store, track, &args);
        if !args.json {
            pb.suspend(|| print_report(&report, args.verbose));
        }
        reports.push(report);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let summary = RunSummary::new(&args.plan, reports);
    if args.json {
        print_json(&summary)?;
    } else {
        print_summary(&summary);
    }

    if summary.failed > 0 {
        bail!("{} of {} track(s) failed", summary.failed, summary.tracks.len());
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn process_track(store: &mut Store, track: &Path, args: &Args) -> TrackReport {
    let start = Instant::now();

    if args.skip_cached() && store.has_fresh_cache(track) {
        log::info!("Skipping {}: already cached", track.display());
        return TrackReport::new(track.to_path_buf(), TrackStatus::Skipped, 0.0);
    }

    match store.select_track(track) {
        Ok(output) => {
            let elapsed = start.elapsed().as_secs_f64();
            TrackReport::new(track.to_path_buf(), TrackStatus::Generated, elapsed).with_output(output)
        }
        Err(e) => {
            log::error!("{}: {}", track.display(), e);
            TrackReport::new(
                track.to_path_buf(),
                TrackStatus::Failed(e.to_string()),
                start.elapsed().as_secs_f64(),
            )
        }
    }
}
