//! Configuration module for Whirling

mod pipeline;

pub use pipeline::{CorruptCachePolicy, PipelineConfig, PipelineConfigBuilder};
