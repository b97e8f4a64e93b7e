// Report cleaning pipeline: file resolution, per-stage runner, the twelve stages, orchestration

pub mod classifier;
pub mod orchestrator;
pub mod resolver;
pub mod runner;
pub mod stages;

pub use classifier::{FileClassifier, MarkerClassifier};
pub use orchestrator::{Pipeline, PipelineOutcome};
pub use resolver::{FileResolver, ResolvedFile};
pub use runner::{FileError, SkippedFile, StageReport, StageRunner};
pub use stages::{
    default_stages, FailurePolicy, FileScope, ProbabilityRow, ProbabilityTable, Stage,
    StageContext, StageResult,
};
