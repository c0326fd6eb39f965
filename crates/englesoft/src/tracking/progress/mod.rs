//! Progress cycles bracketing a training period.

pub mod domain;
pub mod router;
mod tracker;

pub use domain::{NewProgress, ProgressClosure, ProgressId, ProgressRecord, ProgressState};
pub use router::progress_routes;
pub use tracker::{ProgressError, ProgressOutcome, ProgressTracker};
