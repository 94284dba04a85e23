pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{
    classification_stage, composite_stage, configured_windows, load_masked_scenes,
    run_classification_reported, run_composites_reported, run_pipeline, run_pipeline_reported,
    run_pipeline_with,
};
pub use types::{
    ClassificationFailure, CompositeOutput, FloodOutput, PipelineOutput, PipelineStage,
    ProgressReporter,
};
