use serde::Serialize;

use super::domain::{NewProgress, ProgressClosure, ProgressRecord};
use crate::error::{Failure, IntoFailure};
use crate::tracking::evaluations::{Evaluation, EvaluationId, EvaluationKind};
use crate::tracking::store::{RepositoryError, TrackingUnit};

/// What happened to the student's progress when an evaluation was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resultado")]
pub enum ProgressOutcome {
    #[serde(rename = "abierto")]
    Opened(ProgressRecord),
    #[serde(rename = "cerrado")]
    Closed(ProgressRecord),
    #[serde(rename = "sin_vincular")]
    Unlinked {
        #[serde(rename = "motivo")]
        reason: String,
    },
}

impl ProgressOutcome {
    pub fn record(&self) -> Option<&ProgressRecord> {
        match self {
            Self::Opened(record) | Self::Closed(record) => Some(record),
            Self::Unlinked { .. } => None,
        }
    }
}

/// Drives the no-progress → open → closed cycle inside a caller-owned unit of work.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTracker;

impl ProgressTracker {
    pub fn new() -> Self {
        Self
    }

    /// Opens a cycle for an `inicial` evaluation and closes one for a `final` evaluation.
    pub async fn apply<U: TrackingUnit>(
        &self,
        unit: &mut U,
        evaluation: &Evaluation,
    ) -> Result<ProgressOutcome, ProgressError> {
        match evaluation.kind {
            EvaluationKind::Initial => self.open(unit, evaluation).await.map(ProgressOutcome::Opened),
            EvaluationKind::Final => self.close(unit, evaluation).await.map(ProgressOutcome::Closed),
        }
    }

    pub async fn open<U: TrackingUnit>(
        &self,
        unit: &mut U,
        initial: &Evaluation,
    ) -> Result<ProgressRecord, ProgressError> {
        if unit.latest_open_progress(&initial.student).await?.is_some() {
            return Err(ProgressError::CycleAlreadyOpen);
        }

        let progress = NewProgress {
            student: initial.student.clone(),
            initial_evaluation: initial.id,
            initial_level: initial.level.clone(),
            started_on: initial.taken_at.date_naive(),
        };

        unit.insert_progress(progress).await.map_err(|err| match err {
            RepositoryError::Conflict => ProgressError::CycleAlreadyOpen,
            other => other.into(),
        })
    }

    /// Closes the most recently created open cycle; the delta is final − initial total.
    pub async fn close<U: TrackingUnit>(
        &self,
        unit: &mut U,
        last: &Evaluation,
    ) -> Result<ProgressRecord, ProgressError> {
        let open = unit
            .latest_open_progress(&last.student)
            .await?
            .ok_or(ProgressError::NoOpenCycle)?;

        let initial_total = unit
            .evaluation_total(open.initial_evaluation)
            .await?
            .ok_or(ProgressError::InitialEvaluationMissing(open.initial_evaluation))?;

        let closure = ProgressClosure {
            final_evaluation: last.id,
            final_level: last.level.clone(),
            improvement: i16::from(last.total_score) - i16::from(initial_total),
            completed_on: last.taken_at.date_naive(),
        };

        unit.close_progress(open.id, &closure).await?;
        Ok(open.closed_with(&closure))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("El estudiante ya tiene un ciclo de progreso abierto")]
    CycleAlreadyOpen,
    #[error("No existe evaluación inicial para este estudiante")]
    NoOpenCycle,
    #[error("La evaluación inicial {0} del ciclo abierto no existe")]
    InitialEvaluationMissing(EvaluationId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntoFailure for ProgressError {
    fn into_failure(self) -> Failure {
        match self {
            Self::Repository(err) => err.into_failure(),
            rule => Failure::BusinessRule(rule.to_string()),
        }
    }
}
