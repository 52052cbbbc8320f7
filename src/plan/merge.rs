// src/plan/merge.rs
//
// Collapse every visualizer's requests into one deduplicated work list.

use std::collections::{BTreeMap, BTreeSet};

use super::model::Plan;
use super::registry::{FeatureName, SignalName, SpectrogramVariant};
use crate::error::Result;

/// Everything that must be computed for one signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalRequests {
    pub features: BTreeSet<FeatureName>,
    pub spectrograms: BTreeSet<SpectrogramVariant>,
}

impl SignalRequests {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.spectrograms.is_empty()
    }
}

/// Work list keyed by signal. Iterates `full` first.
pub type MergedRequests = BTreeMap<SignalName, SignalRequests>;

/// Union of all `true` requests across visualizers.
///
/// Set semantics make the result independent of visualizer order and of
/// duplicates. Signals whose flags are all `false` are left out, so they
/// are never dissected.
pub fn merge(plan: &Plan) -> Result<MergedRequests> {
    let mut merged = MergedRequests::new();

    for entry in plan.visualizers.values() {
        for (signal, request) in &entry.signals {
            let wanted_features = request.features.iter().filter(|&(_, &wants)| wants);
            let wanted_spectrograms = request.spectrograms.iter().filter(|&(_, &wants)| wants);

            let mut features = BTreeSet::new();
            for (name, _) in wanted_features {
                features.insert(name.parse::<FeatureName>()?);
            }
            let mut spectrograms = BTreeSet::new();
            for (name, _) in wanted_spectrograms {
                spectrograms.insert(name.parse::<SpectrogramVariant>()?);
            }
            if features.is_empty() && spectrograms.is_empty() {
                continue;
            }

            let slot = merged.entry(signal.parse::<SignalName>()?).or_default();
            slot.features.extend(features);
            slot.spectrograms.extend(spectrograms);
        }
    }

    Ok(merged)
}
