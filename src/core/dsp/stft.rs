//! Short-time Fourier transform and its inverse

use anyhow::{anyhow, Result};
use num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

use super::windows::hann_window;

/// Complex time-frequency matrix, frame-major.
///
/// Frame `t` holds `bins = fft_size / 2 + 1` coefficients, the first one
/// being DC.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    frames: usize,
    bins: usize,
    fft_size: usize,
    data: Vec<Complex<f32>>,
}

impl Transform {
    pub fn zeros(frames: usize, fft_size: usize) -> Self {
        let bins = fft_size / 2 + 1;
        Self {
            frames,
            bins,
            fft_size,
            data: vec![Complex::new(0.0, 0.0); frames * bins],
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frame(&self, index: usize) -> &[Complex<f32>] {
        &self.data[index * self.bins..(index + 1) * self.bins]
    }

    pub fn frame_mut(&mut self, index: usize) -> &mut [Complex<f32>] {
        &mut self.data[index * self.bins..(index + 1) * self.bins]
    }

    /// Magnitude matrix, frames × bins
    pub fn magnitudes(&self) -> Vec<Vec<f32>> {
        self.data
            .chunks_exact(self.bins)
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }

    /// Element-wise real scaling by a frames × bins mask
    pub fn masked(&self, mask: &[Vec<f32>]) -> Transform {
        let mut out = self.clone();
        for (t, row) in mask.iter().enumerate().take(self.frames) {
            for (c, &m) in out.frame_mut(t).iter_mut().zip(row) {
                *c *= m;
            }
        }
        out
    }
}

/// Centered STFT with a periodic Hann window and zero padding.
///
/// A signal of `n` samples yields `1 + n / hop_length` frames, frame `t`
/// centered on sample `t * hop_length`.
pub struct Stft {
    fft_size: usize,
    hop_length: usize,
    window: Vec<f32>,
    forward_plan: Arc<dyn RealToComplex<f32>>,
    inverse_plan: Arc<dyn ComplexToReal<f32>>,
}

impl Stft {
    pub fn new(fft_size: usize, hop_length: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        Self {
            fft_size,
            hop_length,
            window: hann_window(fft_size),
            forward_plan: planner.plan_fft_forward(fft_size),
            inverse_plan: planner.plan_fft_inverse(fft_size),
        }
    }

    pub fn frame_count(&self, num_samples: usize) -> usize {
        1 + num_samples / self.hop_length
    }

    pub fn forward(&self, samples: &[f32]) -> Result<Transform> {
        // Right pad is `fft_size - pad` so the last frame fits for odd sizes
        let pad = self.fft_size / 2;
        let mut padded = vec![0.0f32; samples.len() + self.fft_size];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let frames = self.frame_count(samples.len());
        let mut transform = Transform::zeros(frames, self.fft_size);

        let mut frame_time = self.forward_plan.make_input_vec();
        let mut frame_freq = self.forward_plan.make_output_vec();
        let mut scratch = self.forward_plan.make_scratch_vec();

        for t in 0..frames {
            let start = t * self.hop_length;
            frame_time
                .iter_mut()
                .zip(&padded[start..start + self.fft_size])
                .zip(&self.window)
                .for_each(|((x, &s), &w)| *x = s * w);

            self.forward_plan
                .process_with_scratch(&mut frame_time, &mut frame_freq, &mut scratch)
                .map_err(|e| anyhow!("forward FFT failed: {}", e))?;

            transform.frame_mut(t).copy_from_slice(&frame_freq);
        }

        Ok(transform)
    }

    /// Overlap-add inverse with window-sum normalization, trimmed to `length`.
    pub fn inverse(&self, transform: &Transform, length: usize) -> Result<Vec<f32>> {
        if transform.fft_size() != self.fft_size {
            return Err(anyhow!(
                "transform has fft_size {}, expected {}",
                transform.fft_size(),
                self.fft_size
            ));
        }

        let frames = transform.frames();
        let padded_len = self.fft_size + self.hop_length * frames.saturating_sub(1);
        let mut output = vec![0.0f32; padded_len];
        let mut window_sum = vec![0.0f32; padded_len];

        let mut frame_freq = self.inverse_plan.make_input_vec();
        let mut frame_time = self.inverse_plan.make_output_vec();
        let mut scratch = self.inverse_plan.make_scratch_vec();
        let bins = frame_freq.len();
        let scale = 1.0 / self.fft_size as f32;

        for t in 0..frames {
            frame_freq.copy_from_slice(transform.frame(t));

            // realfft requires a real DC (and Nyquist, for even sizes) bin
            frame_freq[0].im = 0.0;
            if self.fft_size % 2 == 0 {
                frame_freq[bins - 1].im = 0.0;
            }

            self.inverse_plan
                .process_with_scratch(&mut frame_freq, &mut frame_time, &mut scratch)
                .map_err(|e| anyhow!("inverse FFT failed: {}", e))?;

            let offset = t * self.hop_length;
            for i in 0..self.fft_size {
                output[offset + i] += frame_time[i] * scale * self.window[i];
                window_sum[offset + i] += self.window[i] * self.window[i];
            }
        }

        for (sample, &norm) in output.iter_mut().zip(&window_sum) {
            if norm > f32::MIN_POSITIVE {
                *sample /= norm;
            }
        }

        let start = self.fft_size / 2;
        let mut signal: Vec<f32> = output.into_iter().skip(start).take(length).collect();
        signal.resize(length, 0.0);
        Ok(signal)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }
}
