//! Stage-ordered command organization.
//!
//! The pipeline only sorts, batches, culls and counts. Drawing happens in
//! whatever [`StageSink`] it is executed into, normally the GPU executor's
//! planner.

mod stage;
mod staged;

pub use stage::RenderStage;
pub use staged::{ExecutionStats, RenderPipeline, StageSink};
