// src/config/pipeline.rs
//
// Pipeline configuration and plan-file lookup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::plan::Plan;

/// What to do when a cache artifact exists but cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptCachePolicy {
    /// Log, then regenerate and overwrite the artifact
    #[default]
    Regenerate,
    /// Surface `CacheLoad` to the caller
    Fail,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding `{plan_name}.json` files
    pub plans_dir: PathBuf,
    /// Reuse on-disk artifacts when they match the plan
    pub use_cache: bool,
    /// Policy for unreadable artifacts
    pub corrupt_cache: CorruptCachePolicy,
    /// Separation margin for the harmonic/percussive split
    pub hpss_margin: f32,
    /// Median filter length (frames and bins) for the harmonic/percussive split
    pub hpss_kernel: usize,
    /// Box filter length for `loudness_smoothed`
    pub smoothing_window: usize,
    /// Dynamic range kept by decibel conversions
    pub top_db: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            plans_dir: PathBuf::from("plans"),
            use_cache: true,
            corrupt_cache: CorruptCachePolicy::Regenerate,
            hpss_margin: 2.0,
            hpss_kernel: 31,
            smoothing_window: 15,
            top_db: 80.0,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Candidate locations for a plan, in lookup order.
    pub fn plan_candidates(&self, plan_name: &str) -> Vec<PathBuf> {
        let file_name = format!("{}.json", plan_name);
        let mut candidates = vec![self.plans_dir.join(&file_name)];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("whirling").join("plans").join(&file_name));
        }
        candidates
    }

    /// Find and parse the named plan. Does not validate it.
    pub fn load_plan(&self, plan_name: &str) -> Result<Plan> {
        let candidates = self.plan_candidates(plan_name);
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => {
                log::info!("Loading plan '{}' from {}", plan_name, path.display());
                Plan::from_file(path)
            }
            None => Err(PipelineError::PlanNotFound {
                name: plan_name.to_string(),
                searched: candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Builder for custom pipeline configurations
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn plans_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.plans_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.config.use_cache = use_cache;
        self
    }

    pub fn corrupt_cache(mut self, policy: CorruptCachePolicy) -> Self {
        self.config.corrupt_cache = policy;
        self
    }

    pub fn hpss_margin(mut self, margin: f32) -> Self {
        self.config.hpss_margin = margin.max(1.0);
        self
    }

    pub fn hpss_kernel(mut self, kernel: usize) -> Self {
        self.config.hpss_kernel = kernel.max(1);
        self
    }

    pub fn smoothing_window(mut self, window: usize) -> Self {
        self.config.smoothing_window = window.max(1);
        self
    }

    pub fn top_db(mut self, top_db: f32) -> Self {
        self.config.top_db = top_db.abs();
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
