//! Window function implementations

use std::f32::consts::PI;

/// Periodic Hann window (the DFT-even form used for STFT analysis)
pub fn hann_window(size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n).cos()))
        .collect()
}

/// Symmetric Gaussian kernel spanning `[-radius, radius]` with the given
/// standard deviation (in samples).
pub fn gaussian_kernel(radius: usize, std: f32) -> Vec<f32> {
    let std = std.max(f32::EPSILON);
    (0..=2 * radius)
        .map(|i| {
            let t = i as f32 - radius as f32;
            (-0.5 * (t / std).powi(2)).exp()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = hann_window(4);
        assert!((window[0]).abs() < 0.01); // ~0 at the left edge
        assert!((window[2] - 1.0).abs() < 0.01); // ~1 at center
    }

    #[test]
    fn test_gaussian_kernel_is_symmetric() {
        let kernel = gaussian_kernel(4, 2.0);
        assert_eq!(kernel.len(), 9);
        assert!((kernel[4] - 1.0).abs() < 1e-6);
        for i in 0..4 {
            assert!((kernel[i] - kernel[8 - i]).abs() < 1e-6);
        }
    }
}
