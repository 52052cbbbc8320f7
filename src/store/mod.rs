// src/store/mod.rs
//
// The plan store: owns the active plan, the per-track working data and the
// cached plan output visualizers read from.

pub mod cache;
mod dissect;
mod features;
mod listener;
mod separation;
mod signals;
mod spectrograms;

pub use cache::{cache_path, signal_export_path, PlanOutput, SignalOutput};
pub use dissect::SignalDissector;
pub use features::{extract, extractor, Extractor, FeatureGenerator, FeatureInput};
pub use listener::{LogListener, NoOpListener, PipelineEvent, PipelineListener};
pub use separation::{SeparationError, StemSeparator, Stems, UnavailableSeparator};
pub use signals::{FeatureData, Signal, SignalStore, Spectrogram};
pub use spectrograms::{custom_log_db, log_bands, SpectrogramVariantGenerator};

use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{CorruptCachePolicy, PipelineConfig};
use crate::core::decoder::{SymphoniaLoader, TrackLoader};
use crate::core::dsp::{HpssParams, Stft};
use crate::error::{PipelineError, Result};
use crate::plan::{merge, validate, MergedRequests, Plan, SignalName};

/// Where the store is in its per-track lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No plan yet
    NoPlan,
    /// Plan validated, no track output available
    PlanLoaded,
    /// Working on the selected track
    Generating,
    /// Plan output for the selected track is ready
    Loaded,
}

struct ActivePlan {
    name: String,
    plan: Plan,
    merged: MergedRequests,
    stft: Stft,
}

/// Plan-driven feature store.
///
/// One instance serves one plan and any number of tracks, one track at a
/// time. Generation is synchronous: `select_track` returns once the output
/// is ready or an error stopped it.
pub struct Store {
    config: PipelineConfig,
    loader: Box<dyn TrackLoader>,
    separator: Box<dyn StemSeparator>,
    listener: Box<dyn PipelineListener>,
    state: StoreState,
    active: Option<ActivePlan>,
    track: Option<PathBuf>,
    signals: SignalStore,
    output: Option<PlanOutput>,
}

impl Store {
    /// Store with the Symphonia loader and no source separation
    pub fn new(config: PipelineConfig) -> Self {
        StoreBuilder::new().config(config).build()
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Look up, parse and validate the named plan.
    pub fn initialize(&mut self, plan_name: &str) -> Result<()> {
        let plan = self.config.load_plan(plan_name)?;
        self.initialize_with_plan(plan_name, plan)
    }

    /// Validate and adopt an in-memory plan under `plan_name`.
    pub fn initialize_with_plan(&mut self, plan_name: &str, plan: Plan) -> Result<()> {
        validate(&plan)?;
        let merged = merge(&plan)?;
        let stft = Stft::new(plan.metadata.fft_size, plan.metadata.hop_length);

        info!(
            "Plan '{}': {} visualizers, {} signals to compute",
            plan_name,
            plan.visualizers.len(),
            merged.len()
        );
        self.listener.on_event(&PipelineEvent::PlanLoaded {
            name: plan_name.to_string(),
            signals: merged.len(),
        });

        self.active = Some(ActivePlan {
            name: plan_name.to_string(),
            plan,
            merged,
            stft,
        });
        self.reset_track();
        self.state = StoreState::PlanLoaded;
        Ok(())
    }

    /// Switch to `track` and make its plan output available.
    ///
    /// Uses the cache artifact when caching is enabled and it was written
    /// by the current plan; otherwise generates and overwrites it. On error
    /// the store is left without a track output.
    pub fn select_track(&mut self, track: &Path) -> Result<&PlanOutput> {
        if self.active.is_none() {
            return Err(PipelineError::NoPlanLoaded);
        }

        self.reset_track();
        self.track = Some(track.to_path_buf());
        self.state = StoreState::Generating;
        self.listener.on_event(&PipelineEvent::TrackSelected {
            track: track.to_path_buf(),
        });

        match self.resolve_track(track) {
            Ok(output) => {
                self.output = Some(output);
                self.state = StoreState::Loaded;
            }
            Err(e) => {
                self.reset_track();
                self.state = StoreState::PlanLoaded;
                return Err(e);
            }
        }

        self.output.as_ref().ok_or(PipelineError::NoPlanLoaded)
    }

    /// Read the cache artifact for `track`.
    ///
    /// `Ok(None)` when there is no artifact or it was written by a different
    /// plan. An unreadable artifact is `CacheLoad`.
    pub fn load_cached(&self, track: &Path) -> Result<Option<PlanOutput>> {
        let active = self.active.as_ref().ok_or(PipelineError::NoPlanLoaded)?;
        let path = cache_path(track, &active.name);
        if !path.exists() {
            return Ok(None);
        }

        let start = Instant::now();
        let output = cache::load(&path)?;
        if !output.matches(&active.name, &active.plan) {
            warn!(
                "Cache {} was written by a different version of plan '{}', regenerating",
                path.display(),
                active.name
            );
            return Ok(None);
        }

        log::debug!("Read cache {} in {} ms", path.display(), start.elapsed().as_millis());
        Ok(Some(output))
    }

    /// Whether `track` already has an up-to-date artifact for this plan
    pub fn has_fresh_cache(&self, track: &Path) -> bool {
        matches!(self.load_cached(track), Ok(Some(_)))
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    /// Polling form of the "plan loaded" notification
    pub fn is_loaded(&self) -> bool {
        self.state == StoreState::Loaded
    }

    pub fn plan_output(&self) -> Option<&PlanOutput> {
        self.output.as_ref()
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.active.as_ref().map(|a| &a.plan)
    }

    pub fn plan_name(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.name.as_str())
    }

    pub fn merged_requests(&self) -> Option<&MergedRequests> {
        self.active.as_ref().map(|a| &a.merged)
    }

    pub fn current_track(&self) -> Option<&Path> {
        self.track.as_deref()
    }

    /// Working data of the current track. Empty after a cache hit.
    pub fn signals(&self) -> &SignalStore {
        &self.signals
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Features and spectrograms of `signal` for the current track.
    pub fn get_signal_data(&self, signal: SignalName) -> Result<&SignalOutput> {
        if self.active.is_none() {
            return Err(PipelineError::NoPlanLoaded);
        }
        self.output
            .as_ref()
            .and_then(|o| o.signal(signal))
            .ok_or(PipelineError::MissingSignalData(signal))
    }

    fn reset_track(&mut self) {
        self.signals.clear();
        self.output = None;
        self.track = None;
    }

    fn resolve_track(&mut self, track: &Path) -> Result<PlanOutput> {
        if self.config.use_cache {
            match self.load_cached(track) {
                Ok(Some(output)) => {
                    let path = cache_path(track, &output.plan_name);
                    info!("Using cached features from {}", path.display());
                    self.listener.on_event(&PipelineEvent::CacheHit { path });
                    return Ok(output);
                }
                Ok(None) => {}
                Err(e @ PipelineError::CacheLoad { .. }) => match self.config.corrupt_cache {
                    CorruptCachePolicy::Fail => return Err(e),
                    CorruptCachePolicy::Regenerate => warn!("{}, regenerating", e),
                },
                Err(e) => return Err(e),
            }
        }

        let active = self.active.as_ref().ok_or(PipelineError::NoPlanLoaded)?;
        let path = cache_path(track, &active.name);
        self.listener.on_event(&PipelineEvent::CacheMiss { path });
        self.generate(track)
    }

    /// Dissect, then spectrograms, then features, then persist.
    fn generate(&mut self, track: &Path) -> Result<PlanOutput> {
        let start = Instant::now();
        let active = self.active.as_ref().ok_or(PipelineError::NoPlanLoaded)?;
        let metadata = &active.plan.metadata;
        let hpss = HpssParams {
            kernel_size: self.config.hpss_kernel,
            margin: self.config.hpss_margin,
            ..HpssParams::default()
        };

        let dissector = SignalDissector::new(
            self.loader.as_ref(),
            self.separator.as_ref(),
            &active.stft,
            metadata.sample_rate,
            hpss,
        );
        for &signal in active.merged.keys() {
            let populated = dissector.ensure(&mut self.signals, track, signal)?;
            if !populated.is_empty() {
                self.listener
                    .on_event(&PipelineEvent::SignalsDissected { signals: populated });
            }
        }

        let spectrograms = SpectrogramVariantGenerator::new(&active.stft, self.config.top_db);
        for (&signal, requests) in &active.merged {
            for &variant in &requests.spectrograms {
                if spectrograms.generate(&mut self.signals, signal, variant)? {
                    self.listener
                        .on_event(&PipelineEvent::SpectrogramGenerated { signal, variant });
                }
            }
        }

        let features = FeatureGenerator::new(
            &active.stft,
            metadata,
            self.config.top_db,
            self.config.smoothing_window,
        );
        for (&signal, requests) in &active.merged {
            for &feature in &requests.features {
                if features.generate(&mut self.signals, signal, feature)? {
                    self.listener
                        .on_event(&PipelineEvent::FeatureGenerated { signal, feature });
                }
            }
        }

        if metadata.save_signals {
            for (&name, signal) in self.signals.iter() {
                if let Some(waveform) = &signal.waveform {
                    let path = signal_export_path(track, &active.name, name);
                    cache::export_waveform(&path, waveform, metadata.sample_rate)?;
                    info!("Exported {} to {}", name, path.display());
                }
            }
        }

        let output = PlanOutput::from_store(&active.name, &active.plan, &active.merged, &self.signals);
        let path = cache_path(track, &active.name);
        let write_start = Instant::now();
        cache::save(&output, &path)?;
        log::debug!("Wrote cache {} in {} ms", path.display(), write_start.elapsed().as_millis());
        self.listener.on_event(&PipelineEvent::CacheWritten { path });

        info!(
            "Generated plan '{}' for {} in {:.2}s",
            active.name,
            track.display(),
            start.elapsed().as_secs_f64()
        );
        Ok(output)
    }
}

/// Builder for stores with custom collaborators
pub struct StoreBuilder {
    config: PipelineConfig,
    loader: Box<dyn TrackLoader>,
    separator: Box<dyn StemSeparator>,
    listener: Box<dyn PipelineListener>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            loader: Box::new(SymphoniaLoader),
            separator: Box::new(UnavailableSeparator),
            listener: Box::new(LogListener),
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn loader<L: TrackLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn separator<S: StemSeparator + 'static>(mut self, separator: S) -> Self {
        self.separator = Box::new(separator);
        self
    }

    pub fn listener<P: PipelineListener + 'static>(mut self, listener: P) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn build(self) -> Store {
        Store {
            config: self.config,
            loader: self.loader,
            separator: self.separator,
            listener: self.listener,
            state: StoreState::NoPlan,
            active: None,
            track: None,
            signals: SignalStore::new(),
            output: None,
        }
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
