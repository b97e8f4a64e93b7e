pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod scoring;
pub mod workbook;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineOutcome, StageReport};
pub use progress::{NullProgress, ProgressSink, ProgressTracker, ProgressUpdate};
