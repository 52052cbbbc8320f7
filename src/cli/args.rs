//! CLI argument parsing for the precache runner

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{CorruptCachePolicy, PipelineConfig};

/// Precompute plan outputs (features and spectrograms) for audio tracks
#[derive(Parser, Debug, Clone)]
#[command(name = "whirling", version)]
#[command(about = "Precompute and cache audio features for visualizer plans")]
pub struct Args {
    /// Audio files or directories (searched recursively)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Plan to run, looked up as `<plans-dir>/<plan>.json`
    #[arg(short, long, default_value = "default_plan")]
    pub plan: String,

    /// Directory holding plan files
    #[arg(long, env = "WHIRLING_PLANS_DIR", default_value = "plans")]
    pub plans_dir: PathBuf,

    /// Regenerate every track, even ones with an up-to-date cache
    #[arg(long)]
    pub blast_cache: bool,

    /// Reuse cache artifacts that match the plan
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub use_cache: bool,

    /// What to do with cache files that cannot be read
    #[arg(long, value_enum, default_value = "regenerate")]
    pub corrupt_cache: CorruptCacheArg,

    /// Print a JSON summary instead of text
    #[arg(long)]
    pub json: bool,

    /// Debug logging and per-signal details
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum CorruptCacheArg {
    /// Log the problem and regenerate the artifact
    Regenerate,
    /// Report the track as failed
    Fail,
}

impl From<CorruptCacheArg> for CorruptCachePolicy {
    fn from(arg: CorruptCacheArg) -> Self {
        match arg {
            CorruptCacheArg::Regenerate => CorruptCachePolicy::Regenerate,
            CorruptCacheArg::Fail => CorruptCachePolicy::Fail,
        }
    }
}

impl Args {
    /// Pipeline configuration implied by the flags
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::builder()
            .plans_dir(&self.plans_dir)
            .use_cache(self.use_cache && !self.blast_cache)
            .corrupt_cache(self.corrupt_cache.into())
            .build()
    }

    /// Whether tracks with a fresh cache artifact are skipped outright
    pub fn skip_cached(&self) -> bool {
        self.use_cache && !self.blast_cache
    }
}
