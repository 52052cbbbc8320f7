// src/store/spectrograms.rs
//
// Spectrogram variants derived from a signal's transform.

use log::debug;
use std::time::Instant;

use crate::core::dsp::{amplitude_to_db, Stft};
use crate::error::Result;
use crate::plan::{SignalName, SpectrogramVariant};

use super::dissect::ensure_transform;
use super::signals::{SignalStore, Spectrogram};

/// Generates spectrogram variants, memoized per signal.
pub struct SpectrogramVariantGenerator<'a> {
    stft: &'a Stft,
    top_db: f32,
}

impl<'a> SpectrogramVariantGenerator<'a> {
    pub fn new(stft: &'a Stft, top_db: f32) -> Self {
        Self { stft, top_db }
    }

    /// Compute `variant` for `signal` unless it already exists.
    ///
    /// Returns whether anything was computed. The signal must already have a
    /// waveform; its transform is computed here if missing.
    pub fn generate(
        &self,
        signals: &mut SignalStore,
        signal: SignalName,
        variant: SpectrogramVariant,
    ) -> Result<bool> {
        let already = signals
            .get(signal)
            .map_or(false, |s| s.spectrograms.contains_key(&variant));
        if already {
            return Ok(false);
        }

        let start = Instant::now();
        let magnitudes = ensure_transform(signals, self.stft, signal)?.magnitudes();
        let spectrogram = match variant {
            SpectrogramVariant::CustomLogDb => custom_log_db(&magnitudes, self.top_db),
            SpectrogramVariant::Db => amplitude_to_db(&magnitudes, self.top_db),
        };

        debug!(
            "{} spectrogram for {}: {} frames x {} rows in {} ms",
            variant,
            signal,
            spectrogram.len(),
            spectrogram.first().map_or(0, Vec::len),
            start.elapsed().as_millis()
        );
        signals.entry(signal).spectrograms.insert(variant, spectrogram);
        Ok(true)
    }

    /// String-keyed entry point; unknown names are `UnknownSpectrogram`.
    pub fn generate_by_name(
        &self,
        signals: &mut SignalStore,
        signal: SignalName,
        variant: &str,
    ) -> Result<bool> {
        self.generate(signals, signal, variant.parse()?)
    }
}

/// Bin ranges `[lo, hi)` that grow by a semitone (2^(1/12)) each, covering
/// bins up to the largest power of two below `bins`. Ranges that would be
/// empty after flooring are dropped.
pub fn log_bands(bins: usize) -> Vec<(usize, usize)> {
    if bins < 2 {
        return (0..bins).map(|b| (b, b + 1)).collect();
    }

    let max_power = ((bins - 1) as f64).log2().floor() as i32;
    (0..=max_power * 12)
        .filter_map(|i| {
            let lo = 2f64.powf((i - 1) as f64 / 12.0).floor() as usize;
            let hi = 2f64.powf(i as f64 / 12.0).floor() as usize;
            (lo != hi).then_some((lo, hi.min(bins)))
        })
        .collect()
}

/// Decibel spectrogram (relative to its maximum) averaged into
/// semitone-spaced bands. Output is frames × bands.
pub fn custom_log_db(magnitudes: &[Vec<f32>], top_db: f32) -> Spectrogram {
    let db = amplitude_to_db(magnitudes, top_db);
    let bands = log_bands(db.first().map_or(0, Vec::len));

    db.iter()
        .map(|frame| {
            bands
                .iter()
                .map(|&(lo, hi)| frame[lo..hi].iter().sum::<f32>() / (hi - lo) as f32)
                .collect()
        })
        .collect()
}
