use crate::classify::FloodMap;
use crate::composite::{Composite, CompositeMetadata};
use crate::error::WetmapError;
use crate::filter::Rejection;
use crate::summary::{AreaRecord, SumRaster, VarianceRaster};

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Loading,
    Masking,
    GapFilling,
    Compositing,
    Filtering,
    Classifying,
    Summarizing,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading scenes"),
            Self::Masking => write!(f, "Masking clouds"),
            Self::GapFilling => write!(f, "Filling gaps"),
            Self::Compositing => write!(f, "Building composites"),
            Self::Filtering => write!(f, "Filtering composites"),
            Self::Classifying => write!(f, "Classifying floods"),
            Self::Summarizing => write!(f, "Summarizing"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Result of the Composite Builder.
#[derive(Clone, Debug, Default)]
pub struct CompositeOutput {
    /// Composites that passed filtering, in window order.
    pub composites: Vec<Composite>,
    pub rejected: Vec<Rejection>,
}

/// A composite the classifier could not threshold.
#[derive(Debug)]
pub struct ClassificationFailure {
    pub metadata: CompositeMetadata,
    pub error: WetmapError,
}

/// Result of the Flood Classifier.
#[derive(Debug)]
pub struct FloodOutput {
    pub flood_maps: Vec<FloodMap>,
    pub failures: Vec<ClassificationFailure>,
    pub frequency: SumRaster,
    pub variance: VarianceRaster,
    pub areas: Vec<AreaRecord>,
}

/// Both stages.
#[derive(Debug)]
pub struct PipelineOutput {
    pub composites: CompositeOutput,
    pub floods: FloodOutput,
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., scene count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// Work items within the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
