// src/error.rs
//
// Error taxonomy for plan loading, signal generation and caching.

use std::path::PathBuf;
use thiserror::Error;

use crate::plan::SignalName;

/// Errors surfaced by the plan pipeline.
///
/// Every variant is fatal for the current track: the store stops generating
/// and hands the error back to whoever selected the track. Whether that means
/// skipping the track or exiting the process is the caller's decision.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("plan '{name}' not found (searched: {searched})")]
    PlanNotFound { name: String, searched: String },

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("failed to load track {}: {reason}", path.display())]
    TrackLoad { path: PathBuf, reason: String },

    #[error("failed to dissect signal '{signal}': {reason}")]
    SignalDissection { signal: SignalName, reason: String },

    #[error("source separation is unavailable, cannot produce '{signal}'")]
    SourceSeparationUnavailable { signal: SignalName },

    #[error("signal '{0}' has no waveform yet")]
    SignalNotDissected(SignalName),

    #[error("unknown feature '{0}'")]
    UnknownFeature(String),

    #[error("unknown spectrogram variant '{0}'")]
    UnknownSpectrogram(String),

    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    #[error("failed to load cache {}: {reason}", path.display())]
    CacheLoad { path: PathBuf, reason: String },

    #[error("failed to write cache {}: {reason}", path.display())]
    CacheWrite { path: PathBuf, reason: String },

    #[error("failed to export signal to {}: {reason}", path.display())]
    SignalExport { path: PathBuf, reason: String },

    #[error("no plan loaded, call initialize() first")]
    NoPlanLoaded,

    #[error("no data for signal '{0}' in the loaded plan output")]
    MissingSignalData(SignalName),
}

/// Convenience alias so callers can write `Result<T>` instead of `Result<T, PipelineError>`.
pub type Result<T> = std::result::Result<T, PipelineError>;
