// src/plan/model.rs
//
// Plan document: what to compute for every visualizer in a session.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Global analysis parameters shared by every signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMetadata {
    /// Target sample rate in Hz; tracks are resampled to it on load
    #[serde(alias = "sr")]
    pub sample_rate: u32,
    /// STFT hop in samples
    pub hop_length: usize,
    /// STFT window/FFT size in samples
    #[serde(alias = "n_fft")]
    pub fft_size: usize,
    /// Export materialized waveforms as WAV files next to the track
    #[serde(default)]
    pub save_signals: bool,
}

impl Default for PlanMetadata {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            hop_length: 512,
            fft_size: 2048,
            save_signals: false,
        }
    }
}

/// Per-signal requests of one visualizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalRequest {
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    #[serde(default)]
    pub spectrograms: BTreeMap<String, bool>,
}

/// One visualizer block of a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizerEntry {
    /// Free-form visualizer configuration, passed through untouched
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub signals: BTreeMap<String, SignalRequest>,
}

/// A user-authored computation plan.
///
/// Names are kept as strings here so that a plan naming something outside
/// the registries still parses; `validate` is what rejects it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub metadata: PlanMetadata,
    #[serde(default)]
    pub visualizers: BTreeMap<String, VisualizerEntry>,
}

impl Plan {
    pub fn new(metadata: PlanMetadata) -> Self {
        Self {
            metadata,
            visualizers: BTreeMap::new(),
        }
    }

    /// Parse a plan from JSON. Structural problems (missing metadata fields,
    /// non-boolean request flags) are reported as `InvalidPlan`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PipelineError::InvalidPlan(e.to_string()))
    }

    /// Read and parse a plan file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidPlan(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Add `true` requests for a visualizer/signal pair.
    pub fn with_request(
        mut self,
        visualizer: &str,
        signal: &str,
        features: &[&str],
        spectrograms: &[&str],
    ) -> Self {
        let request = self
            .visualizers
            .entry(visualizer.to_string())
            .or_default()
            .signals
            .entry(signal.to_string())
            .or_default();
        for feature in features {
            request.features.insert(feature.to_string(), true);
        }
        for variant in spectrograms {
            request.spectrograms.insert(variant.to_string(), true);
        }
        self
    }

    /// Hex MD5 of the plan's canonical JSON. Maps are sorted, so two plans
    /// with the same content always hash the same.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", md5::compute(canonical))
    }
}
