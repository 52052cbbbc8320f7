//! Statistical and spectral per-frame measures

use rayon::prelude::*;

/// Smallest power considered by decibel conversions
pub const POWER_AMIN: f32 = 1e-10;

/// Min-max scale into [0, 1]. A constant (or empty) series maps to zeros.
pub fn normalize(values: &[f32]) -> Vec<f32> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                ((v - min) / range).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Centered moving average with zero padding at the edges; output has the
/// same length as the input.
pub fn box_smooth(data: &[f32], window_size: usize) -> Vec<f32> {
    if window_size <= 1 || data.is_empty() {
        return data.to_vec();
    }

    let mut prefix = Vec::with_capacity(data.len() + 1);
    prefix.push(0.0f64);
    for &v in data {
        let last = *prefix.last().unwrap_or(&0.0);
        prefix.push(last + v as f64);
    }

    let n = data.len() as isize;
    let reach_back = (window_size as isize - 1) - (window_size as isize - 1) / 2;
    let reach_fwd = (window_size as isize - 1) / 2;

    (0..n)
        .map(|i| {
            let lo = (i - reach_back).max(0) as usize;
            let hi = (i + reach_fwd + 1).min(n) as usize;
            ((prefix[hi] - prefix[lo]) / window_size as f64) as f32
        })
        .collect()
}

/// Convert powers to dB relative to `reference`, keeping `top_db` of range
/// below the loudest value.
pub fn power_to_db(power: &[f32], reference: f32, top_db: f32) -> Vec<f32> {
    let ref_db = 10.0 * reference.max(POWER_AMIN).log10();
    let db: Vec<f32> = power
        .iter()
        .map(|&p| 10.0 * p.max(POWER_AMIN).log10() - ref_db)
        .collect();

    let peak = db.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    db.into_iter().map(|v| v.max(peak - top_db)).collect()
}

/// Magnitude matrix to dB referenced to its own maximum.
pub fn amplitude_to_db(magnitudes: &[Vec<f32>], top_db: f32) -> Vec<Vec<f32>> {
    let reference = magnitudes
        .iter()
        .flat_map(|row| row.iter())
        .cloned()
        .fold(0.0f32, f32::max);
    let amin = 1e-5f32;
    let ref_db = 20.0 * reference.max(amin).log10();

    let db: Vec<Vec<f32>> = magnitudes
        .iter()
        .map(|row| row.iter().map(|&m| 20.0 * m.max(amin).log10() - ref_db).collect())
        .collect();

    let peak = db
        .iter()
        .flat_map(|row| row.iter())
        .cloned()
        .fold(f32::NEG_INFINITY, f32::max);
    db.into_iter()
        .map(|row| row.into_iter().map(|v| v.max(peak - top_db)).collect())
        .collect()
}

/// Apply `measure` to centered, zero-padded frames of `frame_length`
/// samples taken every `hop_length` samples. Yields `1 + len / hop` values.
pub fn framed_map<F>(samples: &[f32], frame_length: usize, hop_length: usize, measure: F) -> Vec<f32>
where
    F: Fn(&[f32]) -> f32 + Sync,
{
    let pad = frame_length / 2;
    let mut padded = vec![0.0f32; samples.len() + frame_length];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let frames = 1 + samples.len() / hop_length;
    (0..frames)
        .into_par_iter()
        .map(|t| {
            let start = t * hop_length;
            let end = (start + frame_length).min(padded.len());
            measure(&padded[start..end])
        })
        .collect()
}

/// Compute RMS (Root Mean Square)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Zero-crossing rate
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings: usize = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();

    crossings as f32 / samples.len() as f32
}

/// Compute spectral centroid in Hz (brightness measure)
pub fn spectral_centroid(magnitudes: &[f32], sample_rate: u32, fft_size: usize) -> f32 {
    let total_energy: f32 = magnitudes.iter().sum();
    if total_energy < 1e-10 {
        return 0.0;
    }

    let bin_hz = sample_rate as f32 / fft_size as f32;
    let weighted_sum: f32 = magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| i as f32 * bin_hz * m)
        .sum();

    weighted_sum / total_energy
}

/// Compute spectral flatness (Wiener entropy) of a power spectrum
/// Returns 1.0 for white noise, approaches 0.0 for tonal signals
pub fn spectral_flatness(power: &[f32]) -> f32 {
    if power.is_empty() {
        return 0.0;
    }
    let n = power.len() as f32;

    // Geometric mean (via log)
    let log_sum: f32 = power.iter().map(|&p| p.max(POWER_AMIN).ln()).sum();
    let geometric_mean = (log_sum / n).exp();

    // Arithmetic mean
    let arithmetic_mean = power.iter().map(|&p| p.max(POWER_AMIN)).sum::<f32>() / n;

    geometric_mean / arithmetic_mean
}

/// Median of a scratch buffer (reorders it)
pub fn median(data: &mut [f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }

    let mid = data.len() / 2;
    let (_, &mut upper, _) =
        data.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if data.len() % 2 == 0 {
        let lower = data[..mid].iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        (lower + upper) / 2.0
    } else {
        upper
    }
}
