//! Student registry, evaluation recording, progress cycles and the reporting views over
//! them, plus the HTTP routers exposing each area.

pub mod evaluations;
pub mod http;
pub mod levels;
pub mod progress;
pub mod reports;
pub mod store;
pub mod students;

#[cfg(test)]
mod tests;

pub use evaluations::{EvaluationRecorder, LinkagePolicy, ProgressLinkage, RecordedEvaluation};
pub use http::{tracking_router, TrackingState};
pub use levels::{Level, LevelTable};
pub use progress::{ProgressOutcome, ProgressRecord, ProgressState, ProgressTracker};
pub use reports::ReportService;
pub use store::{MemoryStore, PgStore, RepositoryError, Store};
pub use students::{SessionIssuer, StudentService};
