//! Storage abstractions so the services can run against Postgres or memory.
//!
//! Writes that touch both evaluations and progress go through a [`TrackingUnit`], a unit of
//! work obtained from [`TrackingStore::begin`]. Dropping a unit without calling
//! [`TrackingUnit::commit`] discards everything it wrote.

mod memory;
mod postgres;

pub use memory::{MemoryStore, MemoryUnit};
pub use postgres::{PgStore, PgUnit};

use async_trait::async_trait;

use super::evaluations::{Evaluation, EvaluationDraft, EvaluationId};
use super::progress::{NewProgress, ProgressClosure, ProgressId, ProgressRecord};
use super::students::{Student, StudentChanges};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stored data is inconsistent: {0}")]
    Corrupt(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the document is taken.
    async fn insert_student(&self, student: Student) -> Result<Student, RepositoryError>;
    async fn fetch_student(&self, document: &str) -> Result<Option<Student>, RepositoryError>;
    /// All students ordered by name.
    async fn list_students(&self) -> Result<Vec<Student>, RepositoryError>;
    /// Returns the updated row, or `None` when the student does not exist.
    async fn update_student(
        &self,
        document: &str,
        changes: &StudentChanges,
    ) -> Result<Option<Student>, RepositoryError>;
    /// Removes the student with their evaluations and progress; `false` when absent.
    async fn delete_student(&self, document: &str) -> Result<bool, RepositoryError>;
}

/// Transactional writes for the evaluation → progress workflow.
#[async_trait]
pub trait TrackingUnit: Send {
    async fn student_exists(&mut self, document: &str) -> Result<bool, RepositoryError>;
    async fn insert_evaluation(
        &mut self,
        draft: EvaluationDraft,
    ) -> Result<Evaluation, RepositoryError>;
    async fn evaluation_total(&mut self, id: EvaluationId) -> Result<Option<u8>, RepositoryError>;
    /// Most recently created open cycle for the student, locked for the rest of the unit.
    async fn latest_open_progress(
        &mut self,
        document: &str,
    ) -> Result<Option<ProgressRecord>, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when the student already has an open cycle.
    async fn insert_progress(
        &mut self,
        progress: NewProgress,
    ) -> Result<ProgressRecord, RepositoryError>;
    async fn close_progress(
        &mut self,
        id: ProgressId,
        closure: &ProgressClosure,
    ) -> Result<(), RepositoryError>;
    async fn commit(self) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TrackingStore: Send + Sync {
    type Unit: TrackingUnit;

    async fn begin(&self) -> Result<Self::Unit, RepositoryError>;

    /// Deletes the evaluation and any progress cycle referencing it; `false` when absent.
    async fn delete_evaluation(&self, id: EvaluationId) -> Result<bool, RepositoryError>;
}

/// Read side used by the reporting layer.
#[async_trait]
pub trait TrackingQueries: Send + Sync {
    async fn evaluation(&self, id: EvaluationId) -> Result<Option<Evaluation>, RepositoryError>;
    /// The student's evaluations, newest first.
    async fn evaluations_for(&self, document: &str) -> Result<Vec<Evaluation>, RepositoryError>;
    /// Every evaluation, newest first.
    async fn evaluations(&self) -> Result<Vec<Evaluation>, RepositoryError>;
    /// The student's cycles, most recently created first.
    async fn progress_for(&self, document: &str) -> Result<Vec<ProgressRecord>, RepositoryError>;
    /// Every cycle in creation order.
    async fn progress_records(&self) -> Result<Vec<ProgressRecord>, RepositoryError>;
}

/// Everything the HTTP layer needs from a backing store.
pub trait Store: StudentRepository + TrackingStore + TrackingQueries + 'static {}

impl<T> Store for T where T: StudentRepository + TrackingStore + TrackingQueries + 'static {}
