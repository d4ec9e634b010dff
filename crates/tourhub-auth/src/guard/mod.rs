//! Declarative authorization pipeline.

pub mod pipeline;

pub use pipeline::{GuardPipeline, GuardPipelineBuilder, RequestContext};
