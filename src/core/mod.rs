//! Audio decoding and signal processing primitives

pub mod decoder;
pub mod dsp;

pub use decoder::{SymphoniaLoader, TrackLoader};
pub use dsp::{Stft, Transform};
