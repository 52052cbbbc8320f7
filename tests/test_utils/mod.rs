// tests/test_utils/mod.rs
//
// Shared fixtures: scratch directories, WAV writers and test doubles for
// the store's collaborators.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use uuid::Uuid;

use whirling::core::TrackLoader;
use whirling::store::{SeparationError, StemSeparator, Stems};
use whirling::{PipelineEvent, PipelineListener, Plan, PlanMetadata};

/// Fresh directory under the system temp dir, removed on drop
pub struct ScratchDir {
    pub path: PathBuf,
}

impl ScratchDir {
    pub fn new(prefix: &str) -> Self {
        let path = std::env::temp_dir().join(format!("whirling-{}-{}", prefix, Uuid::new_v4()));
        fs::create_dir_all(&path).expect("Failed to create scratch dir");
        Self { path }
    }

    pub fn join<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

pub fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let len = (sample_rate as f32 * seconds) as usize;
    (0..len)
        .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Tone with a decaying click every `interval` seconds
pub fn click_track(sample_rate: u32, seconds: f32, interval: f32) -> Vec<f32> {
    let period = (sample_rate as f32 * interval) as usize;
    sine(220.0, sample_rate, seconds)
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let since = i % period;
            let click = 0.5 * (-(since as f32) / 200.0).exp();
            0.3 * s + click * if since % 2 == 0 { 1.0 } else { -1.0 }
        })
        .collect()
}

/// 16-bit PCM WAV, interleaving `channels` copies of `samples`
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV");
    for &s in samples {
        let value = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value).expect("Failed to write sample");
        }
    }
    writer.finalize().expect("Failed to finalize WAV");
}

pub fn metadata() -> PlanMetadata {
    PlanMetadata {
        sample_rate: 22050,
        hop_length: 512,
        fft_size: 2048,
        save_signals: false,
    }
}

/// Plan with one visualizer requesting `features` on `signal`
pub fn single_request_plan(signal: &str, features: &[&str], spectrograms: &[&str]) -> Plan {
    Plan::new(metadata()).with_request("debug", signal, features, spectrograms)
}

/// Loader that ignores the path and hands out fixed samples
#[derive(Clone)]
pub struct FixedLoader {
    pub samples: Vec<f32>,
    pub loads: Rc<Cell<usize>>,
}

impl FixedLoader {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            loads: Rc::new(Cell::new(0)),
        }
    }

    pub fn silence(seconds: f32, sample_rate: u32) -> Self {
        Self::new(vec![0.0; (seconds * sample_rate as f32) as usize])
    }
}

impl TrackLoader for FixedLoader {
    fn load(&self, _path: &Path, _sample_rate: u32) -> anyhow::Result<Vec<f32>> {
        self.loads.set(self.loads.get() + 1);
        Ok(self.samples.clone())
    }
}

/// Separator that splits the mix into fixed fractions and counts calls
#[derive(Clone, Default)]
pub struct CountingSeparator {
    pub calls: Rc<Cell<usize>>,
}

impl StemSeparator for CountingSeparator {
    fn separate(&self, mix: &[f32], _sample_rate: u32) -> Result<Stems, SeparationError> {
        self.calls.set(self.calls.get() + 1);
        let scaled = |k: f32| mix.iter().map(|s| s * k).collect::<Vec<f32>>();
        Ok(Stems {
            vocals: scaled(0.4),
            drums: scaled(0.3),
            bass: scaled(0.2),
            other: scaled(0.1),
        })
    }
}

/// Records every event for later inspection
#[derive(Clone, Default)]
pub struct RecordingListener {
    pub events: Rc<RefCell<Vec<PipelineEvent>>>,
}

impl RecordingListener {
    pub fn count<F: Fn(&PipelineEvent) -> bool>(&self, predicate: F) -> usize {
        self.events.borrow().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl PipelineListener for RecordingListener {
    fn on_event(&mut self, event: &PipelineEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
