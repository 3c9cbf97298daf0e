pub mod persistence;
pub mod pipeline_config;
pub mod pipeline_runner;

pub use pipeline_config::PipelineConfig;
pub use pipeline_runner::{PipelineOutput, PipelineRunner, RunSummary};
