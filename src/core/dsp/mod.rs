//! Digital Signal Processing utilities

mod hpss;
mod rhythm;
mod stats;
mod stft;
mod windows;

pub use hpss::{hpss, HpssParams};
pub use rhythm::{
    beat_track, estimate_tempo, onset_detect, onset_strength, peak_pick, BeatParams,
    PeakPickParams,
};
pub use stats::{
    amplitude_to_db, box_smooth, framed_map, median, normalize, power_to_db, rms,
    spectral_centroid, spectral_flatness, zero_crossing_rate, POWER_AMIN,
};
pub use stft::{Stft, Transform};
pub use windows::{gaussian_kernel, hann_window};

/// Frame index whose center is nearest to `seconds`
pub fn time_to_frame(seconds: f64, sample_rate: u32, hop_length: usize) -> usize {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64 / hop_length as f64).round() as usize
}

/// Center time of a frame in seconds
pub fn frame_to_time(frame: usize, sample_rate: u32, hop_length: usize) -> f64 {
    (frame * hop_length) as f64 / sample_rate as f64
}
