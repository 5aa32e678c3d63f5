//! Build orchestration.

pub mod build;
pub mod runner;

pub use build::{PreparedBuild, WebfontBuild};
pub use runner::{PipelineRunner, RunReport, RunnerState};
