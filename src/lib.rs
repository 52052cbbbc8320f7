//! Whirling - plan-driven audio feature extraction and caching
//!
//! A *plan* names, per visualizer, which derived signals (the full mix, its
//! harmonic/percussive split, or separated stems) are needed and which
//! features and spectrograms to compute on each. The [`store::Store`]
//! validates the plan, merges overlapping requests, computes every signal
//! and artifact at most once per track, and caches the result next to the
//! track so later runs load it instead of recomputing.
//!
//! ## Module Structure
//!
//! - `plan` - Plan model, name registries, validation and request merging
//! - `store` - Signal dissection, spectrograms, features, cache and the store
//! - `core` - Audio decoding and DSP (STFT, HPSS, onsets, beats)
//! - `config` - Pipeline configuration and plan lookup
//! - `cli` - Precache runner support
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use whirling::{PipelineConfig, Store, SignalName, FeatureName};
//!
//! let mut store = Store::new(PipelineConfig::default());
//! store.initialize("default_plan")?;
//! store.select_track(Path::new("music/latch.mp3"))?;
//!
//! let full = store.get_signal_data(SignalName::Full)?;
//! let rms = full.feature(FeatureName::Rms);
//! ```
//!
//! ## Signals
//!
//! | Signal               | Derived from            | Joint with            |
//! |----------------------|-------------------------|-----------------------|
//! | `full`               | track file              |                       |
//! | `librosa_harmonic`   | `full` transform (HPSS) | `librosa_percussive`  |
//! | `librosa_percussive` | `full` transform (HPSS) | `librosa_harmonic`    |
//! | `spleeter_*`         | `full` waveform         | the other three stems |

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod plan;
pub mod store;

pub use config::{CorruptCachePolicy, PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, Result};
pub use plan::{
    FeatureFlavor, FeatureName, Plan, PlanMetadata, SignalName, SpectrogramVariant, VisualizerKind,
};
pub use store::{
    FeatureData, PipelineEvent, PipelineListener, PlanOutput, SignalOutput, StemSeparator, Store,
    StoreBuilder, StoreState,
};
