//! Plan model, registries, validation and request merging

mod merge;
mod model;
mod registry;
mod validate;

pub use merge::{merge, MergedRequests, SignalRequests};
pub use model::{Plan, PlanMetadata, SignalRequest, VisualizerEntry};
pub use registry::{
    FeatureFlavor, FeatureName, SignalName, SignalOrigin, SpectrogramVariant, VisualizerKind,
};
pub use validate::validate;
