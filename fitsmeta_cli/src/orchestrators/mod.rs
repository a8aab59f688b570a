//! Command orchestrators
//!
//! Commands describe their pipeline as a [`PipelinePlan`]; the
//! [`PipelineOrchestrator`] resolves inputs and outputs and runs it.

pub mod pipeline_orchestrator;
pub mod plan;

pub use pipeline_orchestrator::{InputSpec, OutputChoice, PipelineOrchestrator, RunSummary};
pub use plan::{InputItem, PipelinePlan, SinkSpec, SourceKind, StageSpec};
