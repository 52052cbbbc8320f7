// src/store/separation.rs
//
// Four-stem source separation seam. The model itself lives outside this
// crate; callers plug one in through `StemSeparator`.

use thiserror::Error;

use crate::plan::SignalName;

/// Jointly separated stems, each the length of the input mix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stems {
    pub vocals: Vec<f32>,
    pub drums: Vec<f32>,
    pub bass: Vec<f32>,
    pub other: Vec<f32>,
}

impl Stems {
    /// Pair each stem with the signal it populates
    pub fn into_signals(self) -> [(SignalName, Vec<f32>); 4] {
        [
            (SignalName::SpleeterVocals, self.vocals),
            (SignalName::SpleeterDrums, self.drums),
            (SignalName::SpleeterBass, self.bass),
            (SignalName::SpleeterOther, self.other),
        ]
    }
}

#[derive(Debug, Error)]
pub enum SeparationError {
    #[error("no source separation backend is available")]
    Unavailable,

    #[error("separation failed: {0}")]
    Failed(String),
}

/// Splits a mono mix into vocals, drums, bass and other.
pub trait StemSeparator {
    fn separate(&self, mix: &[f32], sample_rate: u32) -> Result<Stems, SeparationError>;
}

/// Separator for environments without a model. Always `Unavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSeparator;

impl StemSeparator for UnavailableSeparator {
    fn separate(&self, _mix: &[f32], _sample_rate: u32) -> Result<Stems, SeparationError> {
        Err(SeparationError::Unavailable)
    }
}
