// tests/pipeline_test.rs
//
// End-to-end store behaviour: plan merge, generation, caching and the
// joint-computation guarantees, run against in-memory loaders.

mod test_utils;

use std::fs;

use test_utils::{
    click_track, metadata, sine, single_request_plan, CountingSeparator, FixedLoader,
    RecordingListener, ScratchDir,
};
use whirling::plan::merge;
use whirling::store::{cache_path, signal_export_path};
use whirling::{
    CorruptCachePolicy, FeatureData, FeatureName, PipelineConfig, PipelineError, PipelineEvent,
    Plan, SignalName, SpectrogramVariant, Store, StoreState,
};

fn store_with(loader: FixedLoader, listener: RecordingListener, config: PipelineConfig) -> Store {
    Store::builder()
        .config(config)
        .loader(loader)
        .listener(listener)
        .build()
}

#[test]
fn test_silent_track_rms_and_beats() {
    let dir = ScratchDir::new("silence");
    let track = dir.join("silence.wav");
    let plan = single_request_plan("full", &["rms", "beats"], &[]);

    let merged = merge(&plan).unwrap();
    assert_eq!(merged.len(), 1);
    let full = &merged[&SignalName::Full];
    assert_eq!(
        full.features.iter().copied().collect::<Vec<_>>(),
        vec![FeatureName::Beats, FeatureName::Rms]
    );
    assert!(full.spectrograms.is_empty());

    let mut store = store_with(
        FixedLoader::silence(10.0, 22050),
        RecordingListener::default(),
        PipelineConfig::default(),
    );
    store.initialize_with_plan("debug_plan", plan).unwrap();
    store.select_track(&track).unwrap();

    assert!(store.is_loaded());
    let data = store.get_signal_data(SignalName::Full).unwrap();
    let rms = data.feature(FeatureName::Rms).and_then(FeatureData::as_continuous).unwrap();
    assert_eq!(rms.len(), 1 + 220500 / 512);
    assert!(rms.iter().all(|&v| v == 0.0));

    let beats = data.feature(FeatureName::Beats).and_then(FeatureData::as_discrete).unwrap();
    assert!(beats.is_empty());
}

#[test]
fn test_shared_request_computed_once() {
    let dir = ScratchDir::new("shared");
    let track = dir.join("song.wav");
    let plan = Plan::new(metadata())
        .with_request("debug", "full", &["rms"], &[])
        .with_request("checkerboard", "full", &["rms"], &[]);

    let listener = RecordingListener::default();
    let mut store = store_with(
        FixedLoader::new(sine(440.0, 22050, 2.0)),
        listener.clone(),
        PipelineConfig::default(),
    );
    store.initialize_with_plan("shared", plan).unwrap();
    store.select_track(&track).unwrap();

    let rms_runs = listener.count(|e| {
        matches!(
            e,
            PipelineEvent::FeatureGenerated { signal: SignalName::Full, feature: FeatureName::Rms }
        )
    });
    assert_eq!(rms_runs, 1);
    assert_eq!(store.plan_output().unwrap().signals.len(), 1);
}

#[test]
fn test_cache_keys_do_not_collide() {
    let dir = ScratchDir::new("keys");
    let track = dir.join("song.flac");
    let loader = FixedLoader::new(sine(330.0, 22050, 1.0));
    let listener = RecordingListener::default();
    let mut store = store_with(loader.clone(), listener.clone(), PipelineConfig::default());

    store
        .initialize_with_plan("a", single_request_plan("full", &["rms"], &[]))
        .unwrap();
    store.select_track(&track).unwrap();
    store
        .initialize_with_plan("b", single_request_plan("full", &["spectral_centroid"], &[]))
        .unwrap();
    store.select_track(&track).unwrap();

    let path_a = cache_path(&track, "a");
    let path_b = cache_path(&track, "b");
    assert_ne!(path_a, path_b);
    assert!(path_a.is_file());
    assert!(path_b.is_file());
    assert_eq!(loader.loads.get(), 2);

    listener.clear();
    store
        .initialize_with_plan("a", single_request_plan("full", &["rms"], &[]))
        .unwrap();
    let output = store.select_track(&track).unwrap();
    assert_eq!(output.plan_name, "a");
    assert!(output.signal(SignalName::Full).unwrap().feature(FeatureName::Rms).is_some());
    assert!(output
        .signal(SignalName::Full)
        .unwrap()
        .feature(FeatureName::SpectralCentroid)
        .is_none());

    assert_eq!(listener.count(|e| matches!(e, PipelineEvent::CacheHit { path } if *path == path_a)), 1);
    assert_eq!(listener.count(|e| matches!(e, PipelineEvent::CacheMiss { .. })), 0);
    assert_eq!(loader.loads.get(), 2);
}

#[test]
fn test_cache_round_trip_matches_generated_output() {
    let dir = ScratchDir::new("roundtrip");
    let track = dir.join("song.mp3");
    let plan = single_request_plan(
        "full",
        &["rms", "onsets", "loudness_smoothed", "frame_times"],
        &["custom_log_db"],
    );

    let mut store = store_with(
        FixedLoader::new(click_track(22050, 3.0, 0.5)),
        RecordingListener::default(),
        PipelineConfig::default(),
    );
    store.initialize_with_plan("rt", plan.clone()).unwrap();
    let generated = store.select_track(&track).unwrap().clone();

    let mut reader = store_with(
        FixedLoader::new(Vec::new()),
        RecordingListener::default(),
        PipelineConfig::default(),
    );
    reader.initialize_with_plan("rt", plan).unwrap();
    let cached = reader.load_cached(&track).unwrap().unwrap();
    assert_eq!(cached, generated);

    let spec = cached
        .signal(SignalName::Full)
        .unwrap()
        .spectrogram(SpectrogramVariant::CustomLogDb)
        .unwrap();
    assert_eq!(spec.len(), 1 + 3 * 22050 / 512);
}

#[test]
fn test_edited_plan_invalidates_cache() {
    let dir = ScratchDir::new("stale");
    let track = dir.join("song.wav");
    let listener = RecordingListener::default();
    let mut store = store_with(
        FixedLoader::new(sine(220.0, 22050, 1.0)),
        listener.clone(),
        PipelineConfig::default(),
    );

    store
        .initialize_with_plan("live", single_request_plan("full", &["rms"], &[]))
        .unwrap();
    store.select_track(&track).unwrap();

    listener.clear();
    store
        .initialize_with_plan("live", single_request_plan("full", &["rms", "zero_crossing_rates"], &[]))
        .unwrap();
    let output = store.select_track(&track).unwrap();

    assert!(output
        .signal(SignalName::Full)
        .unwrap()
        .feature(FeatureName::ZeroCrossingRates)
        .is_some());
    assert_eq!(listener.count(|e| matches!(e, PipelineEvent::CacheMiss { .. })), 1);
    assert_eq!(listener.count(|e| matches!(e, PipelineEvent::CacheWritten { .. })), 1);
}

#[test]
fn test_corrupt_cache_policies() {
    let dir = ScratchDir::new("corrupt");
    let track = dir.join("song.wav");
    let path = cache_path(&track, "p");
    fs::write(&path, b"not json at all").unwrap();

    let strict = PipelineConfig::builder()
        .corrupt_cache(CorruptCachePolicy::Fail)
        .build();
    let mut store = store_with(
        FixedLoader::new(sine(220.0, 22050, 1.0)),
        RecordingListener::default(),
        strict,
    );
    store
        .initialize_with_plan("p", single_request_plan("full", &["rms"], &[]))
        .unwrap();
    let err = store.select_track(&track).unwrap_err();
    assert!(matches!(err, PipelineError::CacheLoad { .. }));
    assert_eq!(store.state(), StoreState::PlanLoaded);

    let mut lenient = store_with(
        FixedLoader::new(sine(220.0, 22050, 1.0)),
        RecordingListener::default(),
        PipelineConfig::default(),
    );
    lenient
        .initialize_with_plan("p", single_request_plan("full", &["rms"], &[]))
        .unwrap();
    lenient.select_track(&track).unwrap();
    assert!(lenient.is_loaded());
    assert!(lenient.load_cached(&track).unwrap().is_some());
}

#[test]
fn test_harmonic_percussive_dissected_jointly() {
    let dir = ScratchDir::new("hpss");
    let track = dir.join("song.wav");
    let listener = RecordingListener::default();
    let plan = Plan::new(metadata())
        .with_request("debug", "librosa_percussive", &["rms"], &[])
        .with_request("spectrogram", "librosa_harmonic", &[], &["db"]);

    let mut store = store_with(
        FixedLoader::new(click_track(22050, 2.0, 0.25)),
        listener.clone(),
        PipelineConfig::default(),
    );
    store.initialize_with_plan("hpss", plan).unwrap();
    store.select_track(&track).unwrap();

    let dissections: Vec<_> = listener
        .events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::SignalsDissected { signals } => Some(signals.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(dissections.len(), 1);
    assert_eq!(dissections[0].len(), 3);

    assert!(store.signals().has_waveform(SignalName::LibrosaHarmonic));
    assert!(store.signals().has_waveform(SignalName::LibrosaPercussive));
    assert!(store.get_signal_data(SignalName::LibrosaPercussive).is_ok());
    assert!(store.get_signal_data(SignalName::LibrosaHarmonic).is_ok());
    assert!(matches!(
        store.get_signal_data(SignalName::Full),
        Err(PipelineError::MissingSignalData(SignalName::Full))
    ));
}

#[test]
fn test_stems_separated_once() {
    let dir = ScratchDir::new("stems");
    let track = dir.join("song.wav");
    let separator = CountingSeparator::default();
    let plan = Plan::new(metadata())
        .with_request("stacked_equalizers", "spleeter_vocals", &["loudness"], &[])
        .with_request("stacked_equalizers", "spleeter_drums", &["onset_strength"], &[])
        .with_request("combo_board", "spleeter_bass", &["rms"], &[]);

    let mut store = Store::builder()
        .loader(FixedLoader::new(click_track(22050, 2.0, 0.5)))
        .separator(separator.clone())
        .build();
    store.initialize_with_plan("stems", plan).unwrap();
    let output = store.select_track(&track).unwrap();

    assert_eq!(output.signals.len(), 3);
    assert_eq!(separator.calls.get(), 1);
}

#[test]
fn test_missing_separator_fails_track() {
    let dir = ScratchDir::new("nosep");
    let track = dir.join("song.wav");
    let mut store = store_with(
        FixedLoader::new(sine(220.0, 22050, 1.0)),
        RecordingListener::default(),
        PipelineConfig::default(),
    );
    store
        .initialize_with_plan("stems", single_request_plan("spleeter_other", &["rms"], &[]))
        .unwrap();

    let err = store.select_track(&track).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::SourceSeparationUnavailable { signal: SignalName::SpleeterOther }
    ));
    assert!(!store.is_loaded());
    assert!(!cache_path(&track, "stems").exists());
}

#[test]
fn test_continuous_features_stay_in_unit_range() {
    let dir = ScratchDir::new("bounds");
    let track = dir.join("song.wav");
    let features: Vec<&str> = FeatureName::all()
        .into_iter()
        .filter(FeatureName::is_normalized)
        .map(|f| f.as_str())
        .collect();

    let mut store = store_with(
        FixedLoader::new(click_track(22050, 4.0, 0.5)),
        RecordingListener::default(),
        PipelineConfig::default(),
    );
    store
        .initialize_with_plan("bounds", single_request_plan("full", &features, &[]))
        .unwrap();
    store.select_track(&track).unwrap();

    let data = store.get_signal_data(SignalName::Full).unwrap();
    assert_eq!(data.features.len(), features.len());
    for (name, values) in &data.features {
        let values = values.as_continuous().unwrap();
        assert_eq!(values.len(), 1 + 4 * 22050 / 512, "{}", name);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)), "{}", name);
    }
}

#[test]
fn test_beats_on_click_track() {
    let dir = ScratchDir::new("beats");
    let track = dir.join("song.wav");
    let mut store = store_with(
        FixedLoader::new(click_track(22050, 8.0, 0.5)),
        RecordingListener::default(),
        PipelineConfig::default(),
    );
    store
        .initialize_with_plan("beats", single_request_plan("full", &["beats", "onsets"], &[]))
        .unwrap();
    store.select_track(&track).unwrap();

    let data = store.get_signal_data(SignalName::Full).unwrap();
    let beats = data.feature(FeatureName::Beats).and_then(FeatureData::as_discrete).unwrap();
    let onsets = data.feature(FeatureName::Onsets).and_then(FeatureData::as_discrete).unwrap();
    assert!(beats.len() >= 8, "only {} beats", beats.len());
    assert!(beats.windows(2).all(|w| w[0] < w[1]));
    assert!(!onsets.is_empty());
}

#[test]
fn test_save_signals_exports_waveforms() {
    let dir = ScratchDir::new("export");
    let track = dir.join("song.wav");
    let mut plan = single_request_plan("librosa_harmonic", &["rms"], &[]);
    plan.metadata.save_signals = true;

    let mut store = store_with(
        FixedLoader::new(sine(220.0, 22050, 1.0)),
        RecordingListener::default(),
        PipelineConfig::default(),
    );
    store.initialize_with_plan("export", plan).unwrap();
    store.select_track(&track).unwrap();

    for signal in [SignalName::Full, SignalName::LibrosaHarmonic, SignalName::LibrosaPercussive] {
        let path = signal_export_path(&track, "export", signal);
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.duration(), 22050);
    }
}

#[test]
fn test_initialize_from_plans_dir() {
    let plans = ScratchDir::new("plans");
    fs::write(
        plans.join("party.json"),
        r#"{
            "metadata": {"sr": 22050, "hop_length": 512, "n_fft": 2048},
            "visualizers": {
                "checkerboard": {
                    "settings": {"rows": 8},
                    "signals": {"full": {"features": {"onset_strength": true, "beats": false}}}
                }
            }
        }"#,
    )
    .unwrap();
    fs::write(
        plans.join("typo.json"),
        r#"{
            "metadata": {"sr": 22050, "hop_length": 512, "n_fft": 2048},
            "visualizers": {"debug": {"signals": {"full": {"features": {"rsm": true}}}}}
        }"#,
    )
    .unwrap();

    let config = PipelineConfig::builder().plans_dir(&plans.path).build();
    let mut store = Store::builder().config(config).build();

    store.initialize("party").unwrap();
    assert_eq!(store.state(), StoreState::PlanLoaded);
    let merged = store.merged_requests().unwrap();
    assert_eq!(
        merged[&SignalName::Full].features.iter().copied().collect::<Vec<_>>(),
        vec![FeatureName::OnsetStrength]
    );

    assert!(matches!(store.initialize("typo"), Err(PipelineError::InvalidPlan(ref msg)) if msg.contains("rsm")));
    assert!(matches!(
        store.initialize("missing_plan"),
        Err(PipelineError::PlanNotFound { .. })
    ));
}

#[test]
fn test_track_change_resets_working_data() {
    let dir = ScratchDir::new("reset");
    let config = PipelineConfig::builder().use_cache(false).build();
    let mut store = store_with(
        FixedLoader::new(sine(220.0, 22050, 1.0)),
        RecordingListener::default(),
        config,
    );
    store
        .initialize_with_plan("reset", single_request_plan("full", &["rms"], &[]))
        .unwrap();

    store.select_track(&dir.join("one.wav")).unwrap();
    assert_eq!(store.current_track(), Some(dir.join("one.wav").as_path()));
    store.select_track(&dir.join("two.wav")).unwrap();
    assert_eq!(store.current_track(), Some(dir.join("two.wav").as_path()));
    assert!(store.is_loaded());
    assert_eq!(store.signals().len(), 1);
    assert!(cache_path(&dir.join("two.wav"), "reset").is_file());
}

fn run_with_metadata(fft_size: usize, hop_length: usize, samples: usize) -> Store {
    let dir = ScratchDir::new("geometry");
    let track = dir.join("song.wav");
    let mut meta = metadata();
    meta.fft_size = fft_size;
    meta.hop_length = hop_length;
    let plan = Plan::new(meta)
        .with_request("debug", "full", &["rms", "spectral_centroid"], &["custom_log_db"])
        .with_request("combo_board", "librosa_harmonic", &["rms"], &[]);

    let mut waveform = sine(330.0, 22050, 2.0);
    waveform.truncate(samples);
    let mut store = store_with(
        FixedLoader::new(waveform),
        RecordingListener::default(),
        PipelineConfig::default(),
    );
    store.initialize_with_plan("geometry", plan).unwrap();
    store.select_track(&track).unwrap();
    store
}

fn assert_frames(store: &Store, samples: usize, frames: usize) {
    assert_eq!(store.signals().waveform(SignalName::Full).unwrap().len(), samples);
    let full = store.get_signal_data(SignalName::Full).unwrap();
    for feature in [FeatureName::Rms, FeatureName::SpectralCentroid] {
        assert_eq!(full.feature(feature).unwrap().len(), frames, "{}", feature);
    }
    let spec = full.spectrogram(SpectrogramVariant::CustomLogDb).unwrap();
    assert_eq!(spec.len(), frames);

    let harmonic = store.get_signal_data(SignalName::LibrosaHarmonic).unwrap();
    assert_eq!(harmonic.feature(FeatureName::Rms).unwrap().len(), frames);
    for signal in [SignalName::LibrosaHarmonic, SignalName::LibrosaPercussive] {
        assert_eq!(store.signals().waveform(signal).unwrap().len(), samples, "{}", signal);
    }
}

#[test]
fn test_odd_fft_size_runs_to_completion() {
    let samples = 43 * 512;
    let store = run_with_metadata(2049, 512, samples);
    assert!(store.is_loaded());
    assert_frames(&store, samples, 44);
}

#[test]
fn test_hop_longer_than_fft_size() {
    let samples = 10 * 1024;
    let store = run_with_metadata(512, 1024, samples);
    assert!(store.is_loaded());
    assert_frames(&store, samples, 11);
}
