//! Evaluation scoring, persistence and progress linkage.

pub mod domain;
mod recorder;
pub mod router;

pub use domain::{
    Evaluation, EvaluationDraft, EvaluationId, EvaluationKind, EvaluationRequest,
    EvaluationRequestError, EvaluationSubmission, SkillScores, REQUIRED_EVALUATION_FIELDS,
};
pub use recorder::{
    EvaluationError, EvaluationRecorder, LinkagePolicy, ProgressLinkage, RecordedEvaluation,
};
pub use router::evaluation_routes;
