// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;
mod progress;
mod tracks;

pub use args::{Args, CorruptCacheArg};
pub use output::{
    format_report, print_json, print_report, print_summary, summarize, RunSummary, SignalSummary,
    TrackReport, TrackStatus,
};
pub use progress::CliListener;
pub use tracks::{collect_audio_files, is_audio_file, AUDIO_EXTENSIONS};
