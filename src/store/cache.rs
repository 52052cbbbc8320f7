// src/store/cache.rs
//
// Persisted plan outputs keyed by (track, plan name), plus waveform export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::dsp::time_to_frame;
use crate::error::{PipelineError, Result};
use crate::plan::{FeatureName, MergedRequests, Plan, SignalName, SpectrogramVariant};

use super::signals::{FeatureData, SignalStore, Spectrogram};

/// Features and spectrograms of one signal, as consumed by visualizers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalOutput {
    #[serde(default)]
    pub features: BTreeMap<FeatureName, FeatureData>,
    #[serde(default)]
    pub spectrograms: BTreeMap<SpectrogramVariant, Spectrogram>,
}

impl SignalOutput {
    pub fn feature(&self, name: FeatureName) -> Option<&FeatureData> {
        self.features.get(&name)
    }

    pub fn spectrogram(&self, variant: SpectrogramVariant) -> Option<&Spectrogram> {
        self.spectrograms.get(&variant)
    }
}

/// Result of running a plan against one track. Waveforms and transforms
/// are never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutput {
    pub plan_name: String,
    /// `Plan::digest` of the plan that produced this output
    pub plan_digest: String,
    pub generated_at: DateTime<Utc>,
    pub plan: Plan,
    pub signals: BTreeMap<SignalName, SignalOutput>,
}

impl PlanOutput {
    /// Collect the requested artifacts out of the working store.
    ///
    /// Only signals and entries named in `merged` are kept; siblings that
    /// were populated as a side effect of joint computation are left out.
    pub fn from_store(plan_name: &str, plan: &Plan, merged: &MergedRequests, store: &SignalStore) -> Self {
        let signals = merged
            .iter()
            .map(|(&name, requests)| {
                let mut output = SignalOutput::default();
                if let Some(signal) = store.get(name) {
                    for feature in &requests.features {
                        if let Some(data) = signal.features.get(feature) {
                            output.features.insert(*feature, data.clone());
                        }
                    }
                    for variant in &requests.spectrograms {
                        if let Some(spec) = signal.spectrograms.get(variant) {
                            output.spectrograms.insert(*variant, spec.clone());
                        }
                    }
                }
                (name, output)
            })
            .collect();

        Self {
            plan_name: plan_name.to_string(),
            plan_digest: plan.digest(),
            generated_at: Utc::now(),
            plan: plan.clone(),
            signals,
        }
    }

    pub fn signal(&self, name: SignalName) -> Option<&SignalOutput> {
        self.signals.get(&name)
    }

    /// Frame index for a playback position in seconds
    pub fn frame_at(&self, seconds: f64) -> usize {
        time_to_frame(seconds, self.plan.metadata.sample_rate, self.plan.metadata.hop_length)
    }

    /// Whether this output was produced by exactly `plan`
    pub fn matches(&self, plan_name: &str, plan: &Plan) -> bool {
        self.plan_name == plan_name && self.plan_digest == plan.digest()
    }
}

/// `{track_without_ext}_{suffix}` next to the track
fn sibling_path(track: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = track.with_extension("").into_os_string();
    name.push("_");
    name.push(suffix);
    PathBuf::from(name)
}

/// Cache artifact location for a (track, plan) pair
pub fn cache_path(track: &Path, plan_name: &str) -> PathBuf {
    sibling_path(track, &format!("{}.json", plan_name))
}

/// Export location for one materialized signal waveform
pub fn signal_export_path(track: &Path, plan_name: &str, signal: SignalName) -> PathBuf {
    sibling_path(track, &format!("{}_{}.wav", plan_name, signal))
}

/// Read a cache artifact. Missing, unreadable and malformed files are all
/// `CacheLoad`.
pub fn load(path: &Path) -> Result<PlanOutput> {
    let bytes = fs::read(path).map_err(|e| PipelineError::CacheLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::CacheLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write a cache artifact. Goes through a temporary file and a rename so a
/// crash never leaves a truncated artifact behind.
pub fn save(output: &PlanOutput, path: &Path) -> Result<()> {
    let write_err = |reason: String| PipelineError::CacheWrite {
        path: path.to_path_buf(),
        reason,
    };

    let json = serde_json::to_vec(output).map_err(|e| write_err(e.to_string()))?;

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(format!(".{}.tmp", uuid::Uuid::new_v4()));
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, &json).map_err(|e| write_err(e.to_string()))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        write_err(e.to_string())
    })
}

/// Write a mono waveform as a 16-bit WAV file
pub fn export_waveform(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let export_err = |reason: String| PipelineError::SignalExport {
        path: path.to_path_buf(),
        reason,
    };

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| export_err(e.to_string()))?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .map_err(|e| export_err(e.to_string()))?;
    }
    writer.finalize().map_err(|e| export_err(e.to_string()))
}
