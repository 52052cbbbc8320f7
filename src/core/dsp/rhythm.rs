//! Onset envelopes, onset picking, tempo estimation and beat tracking

use log::{debug, info};
use num_complex::Complex;
use rustfft::FftPlanner;

use super::stats::amplitude_to_db;
use super::windows::gaussian_kernel;

/// Spectral flux onset envelope.
///
/// Mean positive first difference of the dB spectrogram across bins. The
/// first frame has no predecessor and is 0.
pub fn onset_strength(magnitudes: &[Vec<f32>], top_db: f32) -> Vec<f32> {
    if magnitudes.is_empty() {
        return Vec::new();
    }

    let db = amplitude_to_db(magnitudes, top_db);
    let mut envelope = Vec::with_capacity(db.len());
    envelope.push(0.0);

    for pair in db.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let bins = cur.len().max(1) as f32;
        let flux: f32 = cur
            .iter()
            .zip(prev)
            .map(|(&c, &p)| (c - p).max(0.0))
            .sum();
        envelope.push(flux / bins);
    }

    envelope
}

/// Peak picking parameters, in frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPickParams {
    pub pre_max: usize,
    pub post_max: usize,
    pub pre_avg: usize,
    pub post_avg: usize,
    pub delta: f32,
    pub wait: usize,
}

impl PeakPickParams {
    /// Onset detection defaults for a frame rate of `sample_rate / hop_length`
    pub fn for_onsets(sample_rate: u32, hop_length: usize) -> Self {
        let frames_per_sec = sample_rate as f32 / hop_length as f32;
        let secs = |s: f32| (s * frames_per_sec) as usize;
        Self {
            pre_max: secs(0.03),
            post_max: 1,
            pre_avg: secs(0.10),
            post_avg: secs(0.10) + 1,
            delta: 0.07,
            wait: secs(0.03),
        }
    }
}

/// Indices `n` where `x[n]` is the local maximum of
/// `x[n - pre_max ..= n + post_max - 1]`, exceeds the local mean by
/// `delta`, and is more than `wait` frames after the previous peak.
pub fn peak_pick(x: &[f32], params: &PeakPickParams) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;

    for i in 0..n {
        let max_lo = i.saturating_sub(params.pre_max);
        let max_hi = (i + params.post_max.max(1)).min(n);
        let local_max = x[max_lo..max_hi].iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        if x[i] < local_max {
            continue;
        }

        let avg_lo = i.saturating_sub(params.pre_avg);
        let avg_hi = (i + params.post_avg.max(1)).min(n);
        let window = &x[avg_lo..avg_hi];
        let local_mean = window.iter().sum::<f32>() / window.len() as f32;
        if x[i] < local_mean + params.delta {
            continue;
        }

        if let Some(prev) = last {
            if i - prev <= params.wait {
                continue;
            }
        }

        peaks.push(i);
        last = Some(i);
    }

    peaks
}

/// Onset frames from an onset envelope. An all-zero envelope has none.
pub fn onset_detect(envelope: &[f32], sample_rate: u32, hop_length: usize) -> Vec<usize> {
    let min = envelope.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = envelope.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if envelope.is_empty() || !(max - min > f32::EPSILON) {
        return Vec::new();
    }

    let scaled: Vec<f32> = envelope.iter().map(|&v| (v - min) / (max - min)).collect();
    peak_pick(&scaled, &PeakPickParams::for_onsets(sample_rate, hop_length))
}

/// Beat tracker settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatParams {
    /// Center of the tempo prior in BPM
    pub start_bpm: f32,
    /// Spread of the tempo prior in octaves
    pub std_bpm: f32,
    /// Penalty for deviating from the tempo period
    pub tightness: f32,
    /// Autocorrelation horizon in seconds
    pub ac_size: f32,
    pub max_tempo: f32,
}

impl Default for BeatParams {
    fn default() -> Self {
        Self {
            start_bpm: 120.0,
            std_bpm: 1.0,
            tightness: 100.0,
            ac_size: 8.0,
            max_tempo: 320.0,
        }
    }
}

/// Tempo in BPM from the autocorrelation of the onset envelope, weighted
/// by a log-normal prior. Returns `None` when there is no periodicity.
pub fn estimate_tempo(
    envelope: &[f32],
    sample_rate: u32,
    hop_length: usize,
    params: &BeatParams,
) -> Option<f32> {
    let frame_rate = sample_rate as f32 / hop_length as f32;
    let max_lag = ((params.ac_size * frame_rate) as usize).min(envelope.len().saturating_sub(1));
    if max_lag < 2 {
        return None;
    }

    let ac = autocorrelate(envelope, max_lag + 1);
    let min_lag = ((60.0 * frame_rate / params.max_tempo).floor() as usize).max(1);

    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        if ac[lag] <= 0.0 {
            continue;
        }
        let bpm = 60.0 * frame_rate / lag as f32;
        let prior = -0.5 * ((bpm.log2() - params.start_bpm.log2()) / params.std_bpm).powi(2);
        let score = (1e6 * ac[lag]).ln_1p() + prior;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    best.map(|(lag, _)| 60.0 * frame_rate / lag as f32)
}

/// Dynamic-programming beat tracker. Returns beat frame indices in
/// increasing order; an all-zero envelope has no beats.
pub fn beat_track(
    envelope: &[f32],
    sample_rate: u32,
    hop_length: usize,
    params: &BeatParams,
) -> Vec<usize> {
    if envelope.iter().all(|&v| v == 0.0) {
        debug!("Beat tracking skipped: onset envelope is silent");
        return Vec::new();
    }

    let bpm = match estimate_tempo(envelope, sample_rate, hop_length, params) {
        Some(bpm) => bpm,
        None => return Vec::new(),
    };
    info!("Estimated tempo: {:.1} BPM", bpm);

    let frame_rate = sample_rate as f32 / hop_length as f32;
    let period = (60.0 * frame_rate / bpm).round().max(1.0);

    let local = local_score(envelope, period);
    let (backlink, cumulative) = dp_beats(&local, period, params.tightness);

    let mut beats = match last_beat(&cumulative) {
        Some(tail) => {
            let mut beats = vec![tail];
            while let Some(prev) = backlink[*beats.last().unwrap_or(&0)] {
                beats.push(prev);
            }
            beats.reverse();
            beats
        }
        None => Vec::new(),
    };

    trim_beats(&local, &mut beats);
    beats
}

fn autocorrelate(x: &[f32], max_size: usize) -> Vec<f32> {
    let n = (2 * x.len()).next_power_of_two();
    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex<f32>> = x
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(n)
        .collect();

    forward.process(&mut buffer);
    for c in buffer.iter_mut() {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }
    inverse.process(&mut buffer);

    buffer.iter().take(max_size).map(|c| c.re / n as f32).collect()
}

fn local_score(envelope: &[f32], period: f32) -> Vec<f32> {
    let n = envelope.len() as f32;
    let mean = envelope.iter().sum::<f32>() / n;
    let var = envelope.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / (n - 1.0).max(1.0);
    let std = var.sqrt().max(f32::EPSILON);
    let scaled: Vec<f32> = envelope.iter().map(|v| v / std).collect();

    let radius = period as usize;
    let kernel = gaussian_kernel(radius, period / 32.0);
    let len = scaled.len() as isize;

    (0..len)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, &w)| {
                    let j = i + k as isize - radius as isize;
                    (0..len).contains(&j).then(|| w * scaled[j as usize])
                })
                .sum()
        })
        .collect()
}

fn dp_beats(local: &[f32], period: f32, tightness: f32) -> (Vec<Option<usize>>, Vec<f32>) {
    let n = local.len();
    let mut backlink = vec![None; n];
    let mut cumulative = vec![0.0f32; n];

    let threshold = 0.01 * local.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let far = (2.0 * period).round() as usize;
    let near = (period / 2.0).round().max(1.0) as usize;
    let mut first_beat = true;

    for i in 0..n {
        let mut best: Option<(usize, f32)> = None;
        if i >= near {
            let lo = i.saturating_sub(far);
            for prev in lo..=i - near {
                let gap = (i - prev) as f32 / period;
                let score = cumulative[prev] - tightness * gap.ln().powi(2);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((prev, score));
                }
            }
        }

        match best {
            Some((prev, score)) if !first_beat => {
                cumulative[i] = local[i] + score;
                backlink[i] = Some(prev);
            }
            _ => {
                cumulative[i] = local[i];
            }
        }

        if first_beat && local[i] >= threshold {
            first_beat = false;
        }
    }

    (backlink, cumulative)
}

fn last_beat(cumulative: &[f32]) -> Option<usize> {
    let n = cumulative.len();
    let maxima: Vec<usize> = (0..n)
        .filter(|&i| {
            let left = if i == 0 { f32::NEG_INFINITY } else { cumulative[i - 1] };
            let right = if i + 1 == n { f32::NEG_INFINITY } else { cumulative[i + 1] };
            cumulative[i] > left && cumulative[i] >= right
        })
        .collect();

    if maxima.is_empty() {
        return None;
    }

    let mut values: Vec<f32> = maxima.iter().map(|&i| cumulative[i]).collect();
    let half_median = 0.5 * super::stats::median(&mut values);
    maxima.into_iter().rev().find(|&i| cumulative[i] >= half_median)
}

/// Drop weak leading and trailing beats
fn trim_beats(local: &[f32], beats: &mut Vec<usize>) {
    if beats.is_empty() {
        return;
    }

    let rms = (beats.iter().map(|&b| local[b].powi(2)).sum::<f32>() / beats.len() as f32).sqrt();
    let threshold = 0.5 * rms;

    while beats.last().map_or(false, |&b| local[b] < threshold) {
        beats.pop();
    }
    let lead = beats.iter().take_while(|&&b| local[b] < threshold).count();
    beats.drain(..lead);
}
