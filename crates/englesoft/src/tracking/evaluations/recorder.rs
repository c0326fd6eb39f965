use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    Evaluation, EvaluationDraft, EvaluationId, EvaluationKind, EvaluationRequest,
    EvaluationRequestError, REQUIRED_EVALUATION_FIELDS,
};
use crate::error::{Failure, IntoFailure};
use crate::tracking::levels::LevelTable;
use crate::tracking::progress::{ProgressError, ProgressOutcome, ProgressTracker};
use crate::tracking::store::{RepositoryError, TrackingStore, TrackingUnit};

/// How a progress failure affects the evaluation that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLinkage {
    /// Evaluation and progress commit together or not at all.
    Required,
    /// The evaluation is kept even when progress cannot be linked.
    BestEffort,
}

impl ProgressLinkage {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "required" => Some(Self::Required),
            "best_effort" | "besteffort" => Some(Self::BestEffort),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::BestEffort => "best_effort",
        }
    }
}

/// Linkage per evaluation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkagePolicy {
    pub initial: ProgressLinkage,
    pub final_: ProgressLinkage,
}

impl LinkagePolicy {
    pub fn for_kind(&self, kind: EvaluationKind) -> ProgressLinkage {
        match kind {
            EvaluationKind::Initial => self.initial,
            EvaluationKind::Final => self.final_,
        }
    }
}

impl Default for LinkagePolicy {
    fn default() -> Self {
        Self {
            initial: ProgressLinkage::BestEffort,
            final_: ProgressLinkage::Required,
        }
    }
}

/// A stored evaluation together with its effect on the progress cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvaluation {
    pub evaluation: Evaluation,
    pub progress: ProgressOutcome,
}

/// Scores, stores and links evaluations.
pub struct EvaluationRecorder<S> {
    store: Arc<S>,
    levels: Arc<LevelTable>,
    tracker: ProgressTracker,
    policy: LinkagePolicy,
}

impl<S> EvaluationRecorder<S>
where
    S: TrackingStore + 'static,
{
    pub fn new(store: Arc<S>, levels: Arc<LevelTable>, policy: LinkagePolicy) -> Self {
        Self {
            store,
            levels,
            tracker: ProgressTracker::new(),
            policy,
        }
    }

    pub fn policy(&self) -> LinkagePolicy {
        self.policy
    }

    pub async fn record(
        &self,
        request: &EvaluationRequest,
    ) -> Result<RecordedEvaluation, EvaluationError> {
        let submission = request.validate()?;
        let total_score = submission.scores.total();
        let draft = EvaluationDraft {
            level: self.levels.resolve(total_score).to_string(),
            student: submission.student,
            kind: submission.kind,
            scores: submission.scores,
            total_score,
            notes: submission.notes,
            taken_at: Utc::now(),
        };

        let mut unit = self.store.begin().await?;
        if !unit.student_exists(&draft.student).await? {
            return Err(EvaluationError::UnknownStudent(draft.student));
        }
        let evaluation = unit.insert_evaluation(draft).await?;

        let progress = match self.policy.for_kind(evaluation.kind) {
            ProgressLinkage::Required => {
                let outcome = self.tracker.apply(&mut unit, &evaluation).await?;
                unit.commit().await?;
                outcome
            }
            ProgressLinkage::BestEffort => {
                unit.commit().await?;
                self.link_separately(&evaluation).await.unwrap_or_else(|err| {
                    warn!(
                        evaluation = %evaluation.id,
                        student = %evaluation.student,
                        error = %err,
                        "evaluation stored without progress linkage"
                    );
                    ProgressOutcome::Unlinked {
                        reason: err.to_string(),
                    }
                })
            }
        };

        info!(
            evaluation = %evaluation.id,
            student = %evaluation.student,
            kind = evaluation.kind.as_str(),
            total = evaluation.total_score,
            level = %evaluation.level,
            "evaluation recorded"
        );

        Ok(RecordedEvaluation {
            evaluation,
            progress,
        })
    }

    /// Returns whether an evaluation was removed. Cycles referencing it go with it.
    pub async fn delete(&self, id: EvaluationId) -> Result<bool, EvaluationError> {
        let removed = self.store.delete_evaluation(id).await?;
        if removed {
            info!(evaluation = %id, "evaluation deleted");
        }
        Ok(removed)
    }

    async fn link_separately(&self, evaluation: &Evaluation) -> Result<ProgressOutcome, ProgressError> {
        let mut unit = self.store.begin().await?;
        let outcome = self.tracker.apply(&mut unit, evaluation).await?;
        unit.commit().await?;
        Ok(outcome)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Invalid(#[from] EvaluationRequestError),
    #[error("Estudiante no encontrado")]
    UnknownStudent(String),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntoFailure for EvaluationError {
    fn into_failure(self) -> Failure {
        match self {
            Self::Invalid(EvaluationRequestError::MissingFields) => Failure::Validation {
                message: EvaluationRequestError::MissingFields.to_string(),
                required_fields: Some(REQUIRED_EVALUATION_FIELDS),
            },
            Self::Invalid(err) => Failure::Validation {
                message: err.to_string(),
                required_fields: None,
            },
            Self::UnknownStudent(_) => Failure::NotFound(self.to_string()),
            Self::Progress(err) => err.into_failure(),
            Self::Repository(err) => err.into_failure(),
        }
    }
}
