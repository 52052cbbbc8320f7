//! Median-filtering harmonic/percussive source separation

use log::debug;
use rayon::prelude::*;

use super::stats::median;
use super::stft::Transform;

/// HPSS parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HpssParams {
    /// Median filter length, applied along both axes
    pub kernel_size: usize,
    /// Separation margin; values above 1 leave a residual in neither part
    pub margin: f32,
    /// Soft-mask exponent
    pub power: f32,
}

impl Default for HpssParams {
    fn default() -> Self {
        Self {
            kernel_size: 31,
            margin: 2.0,
            power: 2.0,
        }
    }
}

/// Split a transform into its harmonic and percussive parts.
///
/// Both outputs have the shape of the input.
pub fn hpss(transform: &Transform, params: &HpssParams) -> (Transform, Transform) {
    let magnitudes = transform.magnitudes();
    let frames = magnitudes.len();
    let bins = transform.bins();
    let half = params.kernel_size.max(1) / 2;

    debug!(
        "HPSS over {} frames x {} bins (kernel {}, margin {})",
        frames, bins, params.kernel_size, params.margin
    );

    // Harmonic: median across time for each bin
    let harmonic: Vec<Vec<f32>> = (0..frames)
        .into_par_iter()
        .map(|t| {
            let lo = t.saturating_sub(half);
            let hi = (t + half + 1).min(frames);
            let mut scratch = Vec::with_capacity(hi - lo);
            (0..bins)
                .map(|k| {
                    scratch.clear();
                    scratch.extend((lo..hi).map(|u| magnitudes[u][k]));
                    median(&mut scratch)
                })
                .collect()
        })
        .collect();

    // Percussive: median across frequency for each frame
    let percussive: Vec<Vec<f32>> = magnitudes
        .par_iter()
        .map(|row| {
            let mut scratch = Vec::with_capacity(2 * half + 1);
            (0..bins)
                .map(|k| {
                    let lo = k.saturating_sub(half);
                    let hi = (k + half + 1).min(bins);
                    scratch.clear();
                    scratch.extend_from_slice(&row[lo..hi]);
                    median(&mut scratch)
                })
                .collect()
        })
        .collect();

    let mask_h = soft_mask(&harmonic, &percussive, params.margin, params.power);
    let mask_p = soft_mask(&percussive, &harmonic, params.margin, params.power);

    (transform.masked(&mask_h), transform.masked(&mask_p))
}

/// `x^p / (x^p + (margin * y)^p)`, zero where both sides vanish
fn soft_mask(x: &[Vec<f32>], y: &[Vec<f32>], margin: f32, power: f32) -> Vec<Vec<f32>> {
    x.iter()
        .zip(y)
        .map(|(xr, yr)| {
            xr.iter()
                .zip(yr)
                .map(|(&a, &b)| {
                    let num = a.powf(power);
                    let den = num + (margin * b).powf(power);
                    if den < f32::MIN_POSITIVE {
                        0.0
                    } else {
                        num / den
                    }
                })
                .collect()
        })
        .collect()
}
