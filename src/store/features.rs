// src/store/features.rs
//
// Feature registry and generator.
//
// Every feature is a pure function of a signal's waveform and transform
// plus the plan's sample rate, hop length and FFT size. Continuous series
// have exactly one value per STFT frame.

use log::debug;
use std::time::Instant;

use crate::core::dsp::{
    beat_track, box_smooth, frame_to_time, framed_map, normalize, onset_detect, onset_strength,
    power_to_db, rms, spectral_centroid, spectral_flatness, zero_crossing_rate, BeatParams, Stft,
    Transform,
};
use crate::error::{PipelineError, Result};
use crate::plan::{FeatureName, PlanMetadata, SignalName};

use super::dissect::ensure_transform;
use super::signals::{FeatureData, SignalStore};

/// Everything an extractor may look at
pub struct FeatureInput<'a> {
    pub waveform: &'a [f32],
    pub transform: &'a Transform,
    pub sample_rate: u32,
    pub hop_length: usize,
    pub fft_size: usize,
    pub top_db: f32,
    pub smoothing_window: usize,
    pub beat: BeatParams,
}

/// Registered handler for a feature
#[derive(Clone, Copy)]
pub enum Extractor {
    Continuous(fn(&FeatureInput<'_>) -> Vec<f32>),
    Discrete(fn(&FeatureInput<'_>) -> Vec<usize>),
}

/// The closed feature registry
pub fn extractor(feature: FeatureName) -> Extractor {
    match feature {
        FeatureName::Beats => Extractor::Discrete(beats),
        FeatureName::Onsets => Extractor::Discrete(onsets),
        FeatureName::FrameTimes => Extractor::Continuous(frame_times),
        FeatureName::Rms => Extractor::Continuous(rms_series),
        FeatureName::SpectralCentroid => Extractor::Continuous(centroid_series),
        FeatureName::SpectralFlatness => Extractor::Continuous(flatness_series),
        FeatureName::ZeroCrossingRates => Extractor::Continuous(zcr_series),
        FeatureName::OnsetStrength => Extractor::Continuous(onset_envelope),
        FeatureName::Loudness => Extractor::Continuous(loudness),
        FeatureName::LoudnessSmoothed => Extractor::Continuous(loudness_smoothed),
    }
}

/// Run `feature` over prepared inputs, normalizing continuous series that
/// are not timestamps.
pub fn extract(feature: FeatureName, input: &FeatureInput<'_>) -> FeatureData {
    match extractor(feature) {
        Extractor::Continuous(f) => {
            let values = f(input);
            if feature.is_normalized() {
                FeatureData::Continuous(normalize(&values))
            } else {
                FeatureData::Continuous(values)
            }
        }
        Extractor::Discrete(f) => FeatureData::Discrete(f(input)),
    }
}

/// Computes features into the working store, memoized per signal.
pub struct FeatureGenerator<'a> {
    stft: &'a Stft,
    metadata: &'a PlanMetadata,
    top_db: f32,
    smoothing_window: usize,
    beat: BeatParams,
}

impl<'a> FeatureGenerator<'a> {
    pub fn new(stft: &'a Stft, metadata: &'a PlanMetadata, top_db: f32, smoothing_window: usize) -> Self {
        Self {
            stft,
            metadata,
            top_db,
            smoothing_window,
            beat: BeatParams::default(),
        }
    }

    /// Compute `feature` for `signal` unless it already exists. Returns
    /// whether anything was computed.
    pub fn generate(
        &self,
        signals: &mut SignalStore,
        signal: SignalName,
        feature: FeatureName,
    ) -> Result<bool> {
        let already = signals
            .get(signal)
            .map_or(false, |s| s.features.contains_key(&feature));
        if already {
            return Ok(false);
        }

        let start = Instant::now();
        ensure_transform(signals, self.stft, signal)?;
        let data = {
            let entry = signals
                .get(signal)
                .ok_or(PipelineError::SignalNotDissected(signal))?;
            let (waveform, transform) = match (&entry.waveform, &entry.transform) {
                (Some(w), Some(t)) => (w.as_slice(), t),
                _ => return Err(PipelineError::SignalNotDissected(signal)),
            };
            let input = FeatureInput {
                waveform,
                transform,
                sample_rate: self.metadata.sample_rate,
                hop_length: self.metadata.hop_length,
                fft_size: self.metadata.fft_size,
                top_db: self.top_db,
                smoothing_window: self.smoothing_window,
                beat: self.beat,
            };
            extract(feature, &input)
        };

        debug!(
            "{} for {}: {} values in {} ms",
            feature,
            signal,
            data.len(),
            start.elapsed().as_millis()
        );
        signals.entry(signal).features.insert(feature, data);
        Ok(true)
    }

    /// String-keyed entry point; unknown names are `UnknownFeature`.
    pub fn generate_by_name(
        &self,
        signals: &mut SignalStore,
        signal: SignalName,
        feature: &str,
    ) -> Result<bool> {
        self.generate(signals, signal, feature.parse()?)
    }
}

fn frame_times(input: &FeatureInput<'_>) -> Vec<f32> {
    (0..input.transform.frames())
        .map(|t| frame_to_time(t, input.sample_rate, input.hop_length) as f32)
        .collect()
}

fn rms_series(input: &FeatureInput<'_>) -> Vec<f32> {
    framed_map(input.waveform, input.fft_size, input.hop_length, rms)
}

fn zcr_series(input: &FeatureInput<'_>) -> Vec<f32> {
    framed_map(input.waveform, input.fft_size, input.hop_length, zero_crossing_rate)
}

fn centroid_series(input: &FeatureInput<'_>) -> Vec<f32> {
    input
        .transform
        .magnitudes()
        .iter()
        .map(|frame| spectral_centroid(frame, input.sample_rate, input.fft_size))
        .collect()
}

fn flatness_series(input: &FeatureInput<'_>) -> Vec<f32> {
    input
        .transform
        .magnitudes()
        .iter()
        .map(|frame| {
            let power: Vec<f32> = frame.iter().map(|m| m * m).collect();
            spectral_flatness(&power)
        })
        .collect()
}

fn onset_envelope(input: &FeatureInput<'_>) -> Vec<f32> {
    onset_strength(&input.transform.magnitudes(), input.top_db)
}

fn onsets(input: &FeatureInput<'_>) -> Vec<usize> {
    onset_detect(&onset_envelope(input), input.sample_rate, input.hop_length)
}

fn beats(input: &FeatureInput<'_>) -> Vec<usize> {
    beat_track(&onset_envelope(input), input.sample_rate, input.hop_length, &input.beat)
}

/// Per-frame power in dB relative to the loudest frame
fn loudness(input: &FeatureInput<'_>) -> Vec<f32> {
    let power: Vec<f32> = (0..input.transform.frames())
        .map(|t| input.transform.frame(t).iter().map(|c| c.norm_sqr()).sum())
        .collect();
    let reference = power.iter().cloned().fold(0.0f32, f32::max);
    power_to_db(&power, reference, input.top_db)
}

fn loudness_smoothed(input: &FeatureInput<'_>) -> Vec<f32> {
    box_smooth(&normalize(&loudness(input)), input.smoothing_window)
}
