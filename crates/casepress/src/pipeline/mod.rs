//! Stage execution pipeline.

pub mod runner;

pub use runner::StageRunner;
