// src/plan/registry.rs
//
// Closed registries of the names a plan may reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Derived audio streams a plan can request data for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalName {
    Full,
    LibrosaHarmonic,
    LibrosaPercussive,
    SpleeterVocals,
    SpleeterBass,
    SpleeterDrums,
    SpleeterOther,
}

/// How a signal's waveform comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOrigin {
    /// Decoded straight from the track file.
    Track,
    /// Joint harmonic/percussive split of the full transform.
    Hpss,
    /// Joint 4-stem source separation of the full waveform.
    StemSeparation,
}

impl SignalName {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Full,
            Self::LibrosaHarmonic,
            Self::LibrosaPercussive,
            Self::SpleeterVocals,
            Self::SpleeterBass,
            Self::SpleeterDrums,
            Self::SpleeterOther,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::LibrosaHarmonic => "librosa_harmonic",
            Self::LibrosaPercussive => "librosa_percussive",
            Self::SpleeterVocals => "spleeter_vocals",
            Self::SpleeterBass => "spleeter_bass",
            Self::SpleeterDrums => "spleeter_drums",
            Self::SpleeterOther => "spleeter_other",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|s| s.as_str() == name)
    }

    pub fn origin(&self) -> SignalOrigin {
        match self {
            Self::Full => SignalOrigin::Track,
            Self::LibrosaHarmonic | Self::LibrosaPercussive => SignalOrigin::Hpss,
            Self::SpleeterVocals | Self::SpleeterBass | Self::SpleeterDrums | Self::SpleeterOther => {
                SignalOrigin::StemSeparation
            }
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| PipelineError::UnknownSignal(s.to_string()))
    }
}

/// Whether a feature is a dense per-frame series or a sparse event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlavor {
    Continuous,
    Discrete,
}

/// Named feature extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    Beats,
    Onsets,
    FrameTimes,
    Rms,
    SpectralCentroid,
    SpectralFlatness,
    ZeroCrossingRates,
    OnsetStrength,
    Loudness,
    LoudnessSmoothed,
}

impl FeatureName {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Beats,
            Self::Onsets,
            Self::FrameTimes,
            Self::Rms,
            Self::SpectralCentroid,
            Self::SpectralFlatness,
            Self::ZeroCrossingRates,
            Self::OnsetStrength,
            Self::Loudness,
            Self::LoudnessSmoothed,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beats => "beats",
            Self::Onsets => "onsets",
            Self::FrameTimes => "frame_times",
            Self::Rms => "rms",
            Self::SpectralCentroid => "spectral_centroid",
            Self::SpectralFlatness => "spectral_flatness",
            Self::ZeroCrossingRates => "zero_crossing_rates",
            Self::OnsetStrength => "onset_strength",
            Self::Loudness => "loudness",
            Self::LoudnessSmoothed => "loudness_smoothed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|f| f.as_str() == name)
    }

    pub fn flavor(&self) -> FeatureFlavor {
        match self {
            Self::Beats | Self::Onsets => FeatureFlavor::Discrete,
            _ => FeatureFlavor::Continuous,
        }
    }

    /// Continuous features are min-max scaled to [0, 1], except timestamps.
    pub fn is_normalized(&self) -> bool {
        self.flavor() == FeatureFlavor::Continuous && *self != Self::FrameTimes
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| PipelineError::UnknownFeature(s.to_string()))
    }
}

/// Spectrogram representations derived from a signal's transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrogramVariant {
    /// Decibel spectrogram averaged into semitone-spaced bands.
    CustomLogDb,
    /// Full-resolution decibel spectrogram.
    Db,
}

impl SpectrogramVariant {
    pub fn all() -> Vec<Self> {
        vec![Self::CustomLogDb, Self::Db]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomLogDb => "custom_log_db",
            Self::Db => "db",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|v| v.as_str() == name)
    }
}

impl fmt::Display for SpectrogramVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpectrogramVariant {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| PipelineError::UnknownSpectrogram(s.to_string()))
    }
}

/// Visualizers that may appear in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualizerKind {
    Debug,
    Checkerboard,
    Spectrogram,
    ComboBoard,
    StackedEqualizers,
    ConcentricSquares,
}

impl VisualizerKind {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Debug,
            Self::Checkerboard,
            Self::Spectrogram,
            Self::ComboBoard,
            Self::StackedEqualizers,
            Self::ConcentricSquares,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Checkerboard => "checkerboard",
            Self::Spectrogram => "spectrogram",
            Self::ComboBoard => "combo_board",
            Self::StackedEqualizers => "stacked_equalizers",
            Self::ConcentricSquares => "concentric_squares",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|v| v.as_str() == name)
    }
}

impl fmt::Display for VisualizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
