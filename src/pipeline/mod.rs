//! Staged research pipeline.
//!
//! One run flows clarify -> brief -> plan -> (research -> execute-task ->
//! increment-index)* -> write over a single typed state record. Stages
//! return partial updates; the reducer in [`state`] folds them in
//! (overwrite-on-write everywhere except the append-only findings). The
//! [`transition`] function owns the single branch point: the research loop
//! repeats while `current_index < plan.len()`.
//!
//! The [`runner`] executes many isolated runs concurrently, streams one
//! event per completed stage, and suspends interactive runs on a
//! clarification request until the client answers (or a timeout reclaims
//! the run).

pub mod runner;
pub mod stages;
pub mod state;
pub mod transition;

pub use runner::{Pipeline, PipelineRunner, RunOptions, RunRegistry, RunnerSettings};
pub use stages::Stage;
pub use state::{RunState, StateUpdate};
pub use transition::{StageId, next_stage};
