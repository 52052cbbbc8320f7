//! Synchronous observation of the store's pipeline.
//!
//! Events are small and carry names and paths only, never sample data, so
//! a listener can drive a progress display or count calls in tests.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::plan::{FeatureName, SignalName, SpectrogramVariant};

/// What the store just did.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A plan was loaded and validated.
    PlanLoaded { name: String, signals: usize },

    /// A new track was selected; prior track data is gone.
    TrackSelected { track: PathBuf },

    /// A matching cache artifact was loaded instead of generating.
    CacheHit { path: PathBuf },

    /// No usable cache artifact; generation follows.
    CacheMiss { path: PathBuf },

    /// One dissection call populated these signals.
    SignalsDissected { signals: BTreeSet<SignalName> },

    SpectrogramGenerated {
        signal: SignalName,
        variant: SpectrogramVariant,
    },

    FeatureGenerated {
        signal: SignalName,
        feature: FeatureName,
    },

    /// The plan output was persisted.
    CacheWritten { path: PathBuf },
}

/// Receives pipeline events as they happen.
pub trait PipelineListener {
    fn on_event(&mut self, event: &PipelineEvent);
}

/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpListener;

impl PipelineListener for NoOpListener {
    #[inline(always)]
    fn on_event(&mut self, _event: &PipelineEvent) {}
}

/// Forwards events to the `log` facade at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl PipelineListener for LogListener {
    fn on_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::PlanLoaded { name, signals } => {
                log::debug!("plan '{}' ready ({} signals)", name, signals)
            }
            PipelineEvent::TrackSelected { track } => log::debug!("track {}", track.display()),
            PipelineEvent::CacheHit { path } => log::debug!("cache hit {}", path.display()),
            PipelineEvent::CacheMiss { path } => log::debug!("cache miss {}", path.display()),
            PipelineEvent::SignalsDissected { signals } => {
                let names: Vec<&str> = signals.iter().map(SignalName::as_str).collect();
                log::debug!("dissected {}", names.join(", "))
            }
            PipelineEvent::SpectrogramGenerated { signal, variant } => {
                log::debug!("spectrogram {}/{}", signal, variant)
            }
            PipelineEvent::FeatureGenerated { signal, feature } => {
                log::debug!("feature {}/{}", signal, feature)
            }
            PipelineEvent::CacheWritten { path } => log::debug!("cache written {}", path.display()),
        }
    }
}

impl<F> PipelineListener for F
where
    F: FnMut(&PipelineEvent),
{
    fn on_event(&mut self, event: &PipelineEvent) {
        self(event)
    }
}
