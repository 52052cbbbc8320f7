// src/plan/validate.rs
//
// Fail-fast plan validation against the registries.

use super::model::Plan;
use super::registry::{FeatureName, SignalName, SpectrogramVariant, VisualizerKind};
use crate::error::{PipelineError, Result};

/// Check a parsed plan before any computation runs.
///
/// Stops at the first problem. Types (numbers, booleans) are already
/// enforced by deserialization; this checks ranges and names.
pub fn validate(plan: &Plan) -> Result<()> {
    let meta = &plan.metadata;
    if meta.sample_rate == 0 {
        return Err(invalid("metadata.sample_rate must be positive"));
    }
    if meta.hop_length == 0 {
        return Err(invalid("metadata.hop_length must be positive"));
    }
    if meta.fft_size < 2 {
        return Err(invalid("metadata.fft_size must be at least 2"));
    }

    for (visualizer, entry) in &plan.visualizers {
        if VisualizerKind::from_name(visualizer).is_none() {
            return Err(invalid(format!("unknown visualizer '{}'", visualizer)));
        }

        for (signal, request) in &entry.signals {
            if SignalName::from_name(signal).is_none() {
                return Err(invalid(format!(
                    "visualizer '{}' requests unknown signal '{}'",
                    visualizer, signal
                )));
            }
            if let Some(feature) = request.features.keys().find(|f| FeatureName::from_name(f).is_none()) {
                return Err(invalid(format!(
                    "visualizer '{}' requests unknown feature '{}' on '{}'",
                    visualizer, feature, signal
                )));
            }
            if let Some(variant) = request
                .spectrograms
                .keys()
                .find(|v| SpectrogramVariant::from_name(v).is_none())
            {
                return Err(invalid(format!(
                    "visualizer '{}' requests unknown spectrogram '{}' on '{}'",
                    visualizer, variant, signal
                )));
            }
        }
    }

    Ok(())
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::InvalidPlan(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanMetadata;

    fn assert_invalid(plan: &Plan, needle: &str) {
        match validate(plan) {
            Err(PipelineError::InvalidPlan(msg)) => {
                assert!(msg.contains(needle), "'{}' should mention '{}'", msg, needle)
            }
            other => panic!("expected InvalidPlan, got {:?}", other),
        }
    }

    #[test]
    fn test_known_names_pass() {
        let plan = Plan::default()
            .with_request("debug", "full", &["rms", "beats", "frame_times"], &[])
            .with_request("checkerboard", "librosa_harmonic", &[], &["custom_log_db"])
            .with_request("stacked_equalizers", "spleeter_vocals", &["loudness_smoothed"], &["db"]);
        assert!(validate(&plan).is_ok());
    }

    #[test]
    fn test_empty_plan_passes() {
        assert!(validate(&Plan::default()).is_ok());
    }

    #[test]
    fn test_rejects_unknown_visualizer() {
        let plan = Plan::default().with_request("waterfall", "full", &["rms"], &[]);
        assert_invalid(&plan, "waterfall");
    }

    #[test]
    fn test_rejects_unknown_signal() {
        let plan = Plan::default().with_request("debug", "spleeter_piano", &["rms"], &[]);
        assert_invalid(&plan, "spleeter_piano");
    }

    #[test]
    fn test_rejects_unknown_feature() {
        let plan = Plan::default().with_request("debug", "full", &["rms", "tempo"], &[]);
        assert_invalid(&plan, "tempo");
    }

    #[test]
    fn test_rejects_unknown_spectrogram() {
        let plan = Plan::default().with_request("spectrogram", "full", &[], &["mel"]);
        assert_invalid(&plan, "mel");
    }

    #[test]
    fn test_rejects_zero_metadata() {
        let plan = Plan::new(PlanMetadata {
            hop_length: 0,
            ..PlanMetadata::default()
        });
        assert_invalid(&plan, "hop_length");

        let plan = Plan::new(PlanMetadata {
            sample_rate: 0,
            ..PlanMetadata::default()
        });
        assert_invalid(&plan, "sample_rate");
    }
}
