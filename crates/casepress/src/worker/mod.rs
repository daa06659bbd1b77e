//! Background stage execution: jobs, the worker pool, and the
//! orchestrator that guards stage transitions.

pub mod job;
pub mod orchestrator;
pub mod pool;

pub use job::{StageJob, StageResult};
pub use orchestrator::TaskOrchestrator;
pub use pool::StagePool;
