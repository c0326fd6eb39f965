//! Read-only projections over students, evaluations and progress cycles.
//!
//! The aggregation itself lives in pure functions (`summary`, `comparison`) that take rows
//! and the level table; [`ReportService`] only loads the rows.

mod comparison;
mod summary;
pub mod views;

use std::collections::HashMap;
use std::sync::Arc;

pub use comparison::compare;
pub use summary::{
    evaluation_stats, general_stats, level_counts, progress_detail, progress_summary,
    student_stats, NOT_STARTED,
};
pub use views::{
    Comparison, EvaluationStats, EvaluationView, GeneralStats, ProgressDetail,
    ProgressSummaryRow, StudentStats,
};

use crate::error::{Failure, IntoFailure};
use crate::tracking::evaluations::{Evaluation, EvaluationId};
use crate::tracking::levels::{Level, LevelTable};
use crate::tracking::store::{RepositoryError, StudentRepository, TrackingQueries};

pub struct ReportService<S> {
    store: Arc<S>,
    levels: Arc<LevelTable>,
}

impl<S> ReportService<S>
where
    S: StudentRepository + TrackingQueries + 'static,
{
    pub fn new(store: Arc<S>, levels: Arc<LevelTable>) -> Self {
        Self { store, levels }
    }

    pub fn levels(&self) -> &[Level] {
        self.levels.levels()
    }

    /// The student's evaluations, newest first, with level name and description.
    pub async fn evaluations_for(&self, document: &str) -> Result<Vec<EvaluationView>, ReportError> {
        let evaluations = self.store.evaluations_for(document).await?;
        Ok(evaluations
            .into_iter()
            .map(|evaluation| self.view(evaluation, None, true))
            .collect())
    }

    pub async fn evaluation(&self, id: EvaluationId) -> Result<EvaluationView, ReportError> {
        let evaluation = self
            .store
            .evaluation(id)
            .await?
            .ok_or(ReportError::EvaluationNotFound)?;
        let student_name = self
            .store
            .fetch_student(&evaluation.student)
            .await?
            .map(|student| student.name);
        Ok(self.view(evaluation, student_name, false))
    }

    /// Every evaluation, newest first, with student and level names.
    pub async fn evaluations(&self) -> Result<Vec<EvaluationView>, ReportError> {
        let names: HashMap<String, String> = self
            .store
            .list_students()
            .await?
            .into_iter()
            .map(|student| (student.document, student.name))
            .collect();
        let evaluations = self.store.evaluations().await?;
        Ok(evaluations
            .into_iter()
            .map(|evaluation| {
                let name = names.get(&evaluation.student).cloned();
                self.view(evaluation, name, false)
            })
            .collect())
    }

    pub async fn evaluation_stats(&self) -> Result<EvaluationStats, ReportError> {
        let evaluations = self.store.evaluations().await?;
        Ok(evaluation_stats(&evaluations, &self.levels))
    }

    pub async fn student_stats(&self, document: &str) -> Result<StudentStats, ReportError> {
        let student = self
            .store
            .fetch_student(document)
            .await?
            .ok_or(ReportError::UnknownStudent)?;
        let evaluations = self.store.evaluations().await?;
        Ok(student_stats(&student, &evaluations))
    }

    pub async fn student_progress(&self, document: &str) -> Result<ProgressDetail, ReportError> {
        let cycles = self.store.progress_for(document).await?;
        let latest = cycles.first().ok_or(ReportError::NoProgress)?;
        let student = self
            .store
            .fetch_student(document)
            .await?
            .ok_or(ReportError::NoProgress)?;
        let evaluations = self.store.evaluations_for(document).await?;
        Ok(progress_detail(latest, &student, &evaluations, &self.levels))
    }

    pub async fn progress_summary(&self) -> Result<Vec<ProgressSummaryRow>, ReportError> {
        let students = self.store.list_students().await?;
        let progress = self.store.progress_records().await?;
        let evaluations = self.store.evaluations().await?;
        Ok(progress_summary(&students, &progress, &evaluations))
    }

    pub async fn general_stats(&self) -> Result<GeneralStats, ReportError> {
        let student_count = self.store.list_students().await?.len();
        let evaluations = self.store.evaluations().await?;
        let progress = self.store.progress_records().await?;
        Ok(general_stats(
            student_count,
            &evaluations,
            &progress,
            &self.levels,
        ))
    }

    pub async fn comparison(&self, document: &str) -> Result<Comparison, ReportError> {
        let cycles = self.store.progress_for(document).await?;
        let evaluations = self.store.evaluations_for(document).await?;
        compare(&cycles, &evaluations, &self.levels).ok_or(ReportError::NothingToCompare)
    }

    fn view(
        &self,
        evaluation: Evaluation,
        student_name: Option<String>,
        with_description: bool,
    ) -> EvaluationView {
        let level = self.levels.find(&evaluation.level);
        EvaluationView {
            level_name: level.map(|level| level.name.clone()),
            level_description: level
                .filter(|_| with_description)
                .map(|level| level.description.clone()),
            student_name,
            evaluation,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Estudiante no encontrado")]
    UnknownStudent,
    #[error("Evaluación no encontrada")]
    EvaluationNotFound,
    #[error("No se encontró progreso para este estudiante")]
    NoProgress,
    #[error("No se encontraron evaluaciones para comparar")]
    NothingToCompare,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntoFailure for ReportError {
    fn into_failure(self) -> Failure {
        match self {
            Self::Repository(err) => err.into_failure(),
            missing => Failure::NotFound(missing.to_string()),
        }
    }
}
