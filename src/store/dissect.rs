// src/store/dissect.rs
//
// Materializes signal waveforms from the track and from each other.

use log::{debug, info};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use crate::core::decoder::TrackLoader;
use crate::core::dsp::{hpss, HpssParams, Stft, Transform};
use crate::error::{PipelineError, Result};
use crate::plan::{SignalName, SignalOrigin};

use super::separation::{SeparationError, StemSeparator};
use super::signals::{Signal, SignalStore};

/// Computes signal waveforms on demand, at most once per track.
pub struct SignalDissector<'a> {
    loader: &'a dyn TrackLoader,
    separator: &'a dyn StemSeparator,
    stft: &'a Stft,
    sample_rate: u32,
    hpss: HpssParams,
}

impl<'a> SignalDissector<'a> {
    pub fn new(
        loader: &'a dyn TrackLoader,
        separator: &'a dyn StemSeparator,
        stft: &'a Stft,
        sample_rate: u32,
        hpss: HpssParams,
    ) -> Self {
        Self {
            loader,
            separator,
            stft,
            sample_rate,
            hpss,
        }
    }

    /// Make sure `name` has a waveform in `signals`.
    ///
    /// Returns every signal this call populated, prerequisites and joint
    /// siblings included. A repeat call for an existing signal returns an
    /// empty set and does no work.
    pub fn ensure(
        &self,
        signals: &mut SignalStore,
        track: &Path,
        name: SignalName,
    ) -> Result<BTreeSet<SignalName>> {
        let mut populated = BTreeSet::new();
        if signals.has_waveform(name) {
            return Ok(populated);
        }

        match name.origin() {
            SignalOrigin::Track => self.load_full(signals, track, &mut populated)?,
            SignalOrigin::Hpss => {
                populated.extend(self.ensure(signals, track, SignalName::Full)?);
                self.split_harmonic_percussive(signals, name, &mut populated)?;
            }
            SignalOrigin::StemSeparation => {
                populated.extend(self.ensure(signals, track, SignalName::Full)?);
                self.separate_stems(signals, name, &mut populated)?;
            }
        }

        Ok(populated)
    }

    fn load_full(
        &self,
        signals: &mut SignalStore,
        track: &Path,
        populated: &mut BTreeSet<SignalName>,
    ) -> Result<()> {
        let start = Instant::now();
        let waveform = self
            .loader
            .load(track, self.sample_rate)
            .map_err(|e| PipelineError::TrackLoad {
                path: track.to_path_buf(),
                reason: format!("{:#}", e),
            })?;
        info!(
            "Loaded {} ({:.1}s at {} Hz) in {} ms",
            track.display(),
            waveform.len() as f64 / self.sample_rate as f64,
            self.sample_rate,
            start.elapsed().as_millis()
        );

        let transform = self
            .stft
            .forward(&waveform)
            .map_err(|e| dissection_error(SignalName::Full, e))?;

        signals.insert(SignalName::Full, Signal::with_waveform(waveform, Some(transform)));
        populated.insert(SignalName::Full);
        Ok(())
    }

    fn split_harmonic_percussive(
        &self,
        signals: &mut SignalStore,
        requested: SignalName,
        populated: &mut BTreeSet<SignalName>,
    ) -> Result<()> {
        let full = signals
            .get(SignalName::Full)
            .ok_or(PipelineError::SignalNotDissected(SignalName::Full))?;
        let length = full.waveform.as_ref().map_or(0, Vec::len);
        let transform = match &full.transform {
            Some(transform) => transform.clone(),
            None => full
                .waveform
                .as_deref()
                .map(|w| self.stft.forward(w))
                .transpose()
                .map_err(|e| dissection_error(requested, e))?
                .ok_or(PipelineError::SignalNotDissected(SignalName::Full))?,
        };

        let start = Instant::now();
        let (harmonic, percussive) = hpss(&transform, &self.hpss);
        for (name, part) in [
            (SignalName::LibrosaHarmonic, harmonic),
            (SignalName::LibrosaPercussive, percussive),
        ] {
            let waveform = self.invert(&part, length, requested)?;
            signals.insert(name, Signal::with_waveform(waveform, Some(part)));
            populated.insert(name);
        }
        debug!("Harmonic/percussive split in {} ms", start.elapsed().as_millis());
        Ok(())
    }

    fn separate_stems(
        &self,
        signals: &mut SignalStore,
        requested: SignalName,
        populated: &mut BTreeSet<SignalName>,
    ) -> Result<()> {
        let mix = signals
            .waveform(SignalName::Full)
            .ok_or(PipelineError::SignalNotDissected(SignalName::Full))?;

        let start = Instant::now();
        let stems = self
            .separator
            .separate(mix, self.sample_rate)
            .map_err(|e| match e {
                SeparationError::Unavailable => {
                    PipelineError::SourceSeparationUnavailable { signal: requested }
                }
                SeparationError::Failed(reason) => PipelineError::SignalDissection {
                    signal: requested,
                    reason,
                },
            })?;

        let expected = mix.len();
        let stems = stems.into_signals();
        if let Some((name, waveform)) = stems.iter().find(|(_, w)| w.len() != expected) {
            return Err(PipelineError::SignalDissection {
                signal: requested,
                reason: format!(
                    "separator returned {} samples for {}, mix has {}",
                    waveform.len(),
                    name,
                    expected
                ),
            });
        }

        for (name, waveform) in stems {
            signals.insert(name, Signal::with_waveform(waveform, None));
            populated.insert(name);
        }
        debug!("Stem separation in {} ms", start.elapsed().as_millis());
        Ok(())
    }

    fn invert(&self, transform: &Transform, length: usize, requested: SignalName) -> Result<Vec<f32>> {
        self.stft
            .inverse(transform, length)
            .map_err(|e| dissection_error(requested, e))
    }
}

/// Transform for `name`, computed from its waveform on first use.
pub(crate) fn ensure_transform<'s>(
    signals: &'s mut SignalStore,
    stft: &Stft,
    name: SignalName,
) -> Result<&'s Transform> {
    let signal = signals
        .get_mut(name)
        .filter(|s| s.has_waveform())
        .ok_or(PipelineError::SignalNotDissected(name))?;

    if signal.transform.is_none() {
        let waveform = signal.waveform.as_deref().unwrap_or_default();
        let transform = stft.forward(waveform).map_err(|e| dissection_error(name, e))?;
        signal.transform = Some(transform);
    }

    signal
        .transform
        .as_ref()
        .ok_or(PipelineError::SignalNotDissected(name))
}

fn dissection_error(signal: SignalName, err: anyhow::Error) -> PipelineError {
    PipelineError::SignalDissection {
        signal,
        reason: format!("{:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::separation::{Stems, UnavailableSeparator};
    use std::cell::Cell;
    use std::path::PathBuf;

    struct SineLoader;

    impl TrackLoader for SineLoader {
        fn load(&self, _path: &Path, sample_rate: u32) -> anyhow::Result<Vec<f32>> {
            Ok((0..sample_rate as usize)
                .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sample_rate as f32).sin())
                .collect())
        }
    }

    struct FailingLoader;

    impl TrackLoader for FailingLoader {
        fn load(&self, _path: &Path, _sample_rate: u32) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("unsupported container")
        }
    }

    #[derive(Default)]
    struct CountingSeparator {
        calls: Cell<usize>,
    }

    impl StemSeparator for CountingSeparator {
        fn separate(&self, mix: &[f32], _sample_rate: u32) -> std::result::Result<Stems, SeparationError> {
            self.calls.set(self.calls.get() + 1);
            Ok(Stems {
                vocals: mix.to_vec(),
                drums: vec![0.0; mix.len()],
                bass: vec![0.0; mix.len()],
                other: vec![0.0; mix.len()],
            })
        }
    }

    struct ShortStemSeparator;

    impl StemSeparator for ShortStemSeparator {
        fn separate(&self, mix: &[f32], _sample_rate: u32) -> std::result::Result<Stems, SeparationError> {
            Ok(Stems {
                vocals: mix.to_vec(),
                drums: mix.to_vec(),
                bass: mix[..mix.len() / 2].to_vec(),
                other: mix.to_vec(),
            })
        }
    }

    fn track() -> PathBuf {
        PathBuf::from("song.wav")
    }

    #[test]
    fn test_full_is_loaded_once() {
        let stft = Stft::new(512, 128);
        let dissector =
            SignalDissector::new(&SineLoader, &UnavailableSeparator, &stft, 8000, HpssParams::default());
        let mut signals = SignalStore::new();

        let first = dissector.ensure(&mut signals, &track(), SignalName::Full).unwrap();
        assert_eq!(first.into_iter().collect::<Vec<_>>(), vec![SignalName::Full]);
        let full = signals.get(SignalName::Full).unwrap();
        assert_eq!(full.transform.as_ref().unwrap().frames(), 1 + 8000 / 128);

        let again = dissector.ensure(&mut signals, &track(), SignalName::Full).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_harmonic_populates_percussive() {
        let stft = Stft::new(512, 128);
        let dissector =
            SignalDissector::new(&SineLoader, &UnavailableSeparator, &stft, 8000, HpssParams::default());
        let mut signals = SignalStore::new();

        let populated = dissector
            .ensure(&mut signals, &track(), SignalName::LibrosaHarmonic)
            .unwrap();
        assert!(populated.contains(&SignalName::Full));
        assert!(populated.contains(&SignalName::LibrosaHarmonic));
        assert!(populated.contains(&SignalName::LibrosaPercussive));
        assert_eq!(signals.waveform(SignalName::LibrosaPercussive).unwrap().len(), 8000);

        let repeat = dissector
            .ensure(&mut signals, &track(), SignalName::LibrosaPercussive)
            .unwrap();
        assert!(repeat.is_empty());
    }

    #[test]
    fn test_stems_are_joint() {
        let stft = Stft::new(512, 128);
        let separator = CountingSeparator::default();
        let dissector =
            SignalDissector::new(&SineLoader, &separator, &stft, 8000, HpssParams::default());
        let mut signals = SignalStore::new();

        dissector.ensure(&mut signals, &track(), SignalName::SpleeterDrums).unwrap();
        dissector.ensure(&mut signals, &track(), SignalName::SpleeterBass).unwrap();

        assert_eq!(separator.calls.get(), 1);
        assert!(signals.has_waveform(SignalName::SpleeterVocals));
        assert!(signals.has_waveform(SignalName::SpleeterOther));
    }

    #[test]
    fn test_stem_length_mismatch_is_rejected() {
        let stft = Stft::new(512, 128);
        let dissector =
            SignalDissector::new(&SineLoader, &ShortStemSeparator, &stft, 8000, HpssParams::default());
        let mut signals = SignalStore::new();

        let err = dissector
            .ensure(&mut signals, &track(), SignalName::SpleeterVocals)
            .unwrap_err();
        match err {
            PipelineError::SignalDissection { signal, reason } => {
                assert_eq!(signal, SignalName::SpleeterVocals);
                assert!(reason.contains("spleeter_bass"), "{}", reason);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!signals.has_waveform(SignalName::SpleeterVocals));
    }

    #[test]
    fn test_unavailable_separator_names_signal() {
        let stft = Stft::new(512, 128);
        let dissector =
            SignalDissector::new(&SineLoader, &UnavailableSeparator, &stft, 8000, HpssParams::default());
        let mut signals = SignalStore::new();

        let err = dissector
            .ensure(&mut signals, &track(), SignalName::SpleeterVocals)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SourceSeparationUnavailable { signal: SignalName::SpleeterVocals }
        ));
    }

    #[test]
    fn test_track_load_failure() {
        let stft = Stft::new(512, 128);
        let dissector =
            SignalDissector::new(&FailingLoader, &UnavailableSeparator, &stft, 8000, HpssParams::default());
        let mut signals = SignalStore::new();

        let err = dissector
            .ensure(&mut signals, &track(), SignalName::LibrosaHarmonic)
            .unwrap_err();
        match err {
            PipelineError::TrackLoad { reason, .. } => assert!(reason.contains("unsupported container")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(signals.is_empty());
    }

    #[test]
    fn test_lazy_transform() {
        let stft = Stft::new(512, 128);
        let mut signals = SignalStore::new();
        signals.insert(SignalName::SpleeterBass, Signal::with_waveform(vec![0.0; 1000], None));

        let frames = ensure_transform(&mut signals, &stft, SignalName::SpleeterBass)
            .unwrap()
            .frames();
        assert_eq!(frames, 1 + 1000 / 128);
        assert!(matches!(
            ensure_transform(&mut signals, &stft, SignalName::Full),
            Err(PipelineError::SignalNotDissected(SignalName::Full))
        ));
    }
}
