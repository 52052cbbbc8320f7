// src/store/signals.rs
//
// Per-track working data: waveforms, transforms and computed artifacts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::dsp::Transform;
use crate::plan::{FeatureFlavor, FeatureName, SignalName, SpectrogramVariant};

/// 2-D spectrogram, frames × rows
pub type Spectrogram = Vec<Vec<f32>>;

/// Output of one feature extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flavor", content = "values", rename_all = "snake_case")]
pub enum FeatureData {
    /// One value per analysis frame
    Continuous(Vec<f32>),
    /// Sorted frame indices of detected events
    Discrete(Vec<usize>),
}

impl FeatureData {
    pub fn flavor(&self) -> FeatureFlavor {
        match self {
            FeatureData::Continuous(_) => FeatureFlavor::Continuous,
            FeatureData::Discrete(_) => FeatureFlavor::Discrete,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeatureData::Continuous(values) => values.len(),
            FeatureData::Discrete(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_continuous(&self) -> Option<&[f32]> {
        match self {
            FeatureData::Continuous(values) => Some(values),
            FeatureData::Discrete(_) => None,
        }
    }

    pub fn as_discrete(&self) -> Option<&[usize]> {
        match self {
            FeatureData::Discrete(events) => Some(events),
            FeatureData::Continuous(_) => None,
        }
    }
}

/// A derived audio stream and everything computed from it so far.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    pub waveform: Option<Vec<f32>>,
    pub transform: Option<Transform>,
    pub features: BTreeMap<FeatureName, FeatureData>,
    pub spectrograms: BTreeMap<SpectrogramVariant, Spectrogram>,
}

impl Signal {
    pub fn with_waveform(waveform: Vec<f32>, transform: Option<Transform>) -> Self {
        Self {
            waveform: Some(waveform),
            transform,
            ..Default::default()
        }
    }

    pub fn has_waveform(&self) -> bool {
        self.waveform.is_some()
    }
}

/// Working store for the current track. Cleared on every track change.
#[derive(Debug, Default)]
pub struct SignalStore {
    signals: BTreeMap<SignalName, Signal>,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: SignalName) -> Option<&Signal> {
        self.signals.get(&name)
    }

    pub fn get_mut(&mut self, name: SignalName) -> Option<&mut Signal> {
        self.signals.get_mut(&name)
    }

    /// Existing entry, or a fresh empty one
    pub fn entry(&mut self, name: SignalName) -> &mut Signal {
        self.signals.entry(name).or_default()
    }

    pub fn insert(&mut self, name: SignalName, signal: Signal) {
        self.signals.insert(name, signal);
    }

    pub fn has_waveform(&self, name: SignalName) -> bool {
        self.get(name).map_or(false, Signal::has_waveform)
    }

    pub fn waveform(&self, name: SignalName) -> Option<&[f32]> {
        self.get(name).and_then(|s| s.waveform.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SignalName, &Signal)> {
        self.signals.iter()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn clear(&mut self) {
        self.signals.clear();
    }
}
