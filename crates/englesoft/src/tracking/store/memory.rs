use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    RepositoryError, StudentRepository, TrackingQueries, TrackingStore, TrackingUnit,
};
use crate::tracking::evaluations::{Evaluation, EvaluationDraft, EvaluationId};
use crate::tracking::progress::{NewProgress, ProgressClosure, ProgressId, ProgressRecord};
use crate::tracking::students::{Student, StudentChanges};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    students: BTreeMap<String, Student>,
    evaluations: BTreeMap<EvaluationId, Evaluation>,
    progress: BTreeMap<ProgressId, ProgressRecord>,
    last_evaluation_id: i64,
    last_progress_id: i64,
}

impl MemoryState {
    fn newest_first(mut evaluations: Vec<Evaluation>) -> Vec<Evaluation> {
        evaluations.sort_by(|a, b| b.taken_at.cmp(&a.taken_at).then(b.id.cmp(&a.id)));
        evaluations
    }

    fn latest_open_progress(&self, document: &str) -> Option<&ProgressRecord> {
        self.progress
            .values()
            .rev()
            .find(|record| record.student == document && record.is_open())
    }
}

/// Process-local store used by tests, the demo and `serve --in-memory`.
///
/// Units of work hold the store lock for their lifetime and operate on a copy of the
/// state, which replaces the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a cycle as-is, bypassing the one-open-cycle check. Stands in for rows that
    /// predate the unique index.
    #[cfg(test)]
    pub(crate) async fn seed_progress(&self, record: ProgressRecord) {
        let mut state = self.state.lock().await;
        state.last_progress_id = state.last_progress_id.max(record.id.0);
        state.progress.insert(record.id, record);
    }
}

pub struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl TrackingUnit for MemoryUnit {
    async fn student_exists(&mut self, document: &str) -> Result<bool, RepositoryError> {
        Ok(self.working.students.contains_key(document))
    }

    async fn insert_evaluation(
        &mut self,
        draft: EvaluationDraft,
    ) -> Result<Evaluation, RepositoryError> {
        if !self.working.students.contains_key(&draft.student) {
            return Err(RepositoryError::NotFound);
        }
        self.working.last_evaluation_id += 1;
        let evaluation = draft.into_evaluation(EvaluationId(self.working.last_evaluation_id));
        self.working
            .evaluations
            .insert(evaluation.id, evaluation.clone());
        Ok(evaluation)
    }

    async fn evaluation_total(&mut self, id: EvaluationId) -> Result<Option<u8>, RepositoryError> {
        Ok(self
            .working
            .evaluations
            .get(&id)
            .map(|evaluation| evaluation.total_score))
    }

    async fn latest_open_progress(
        &mut self,
        document: &str,
    ) -> Result<Option<ProgressRecord>, RepositoryError> {
        Ok(self.working.latest_open_progress(document).cloned())
    }

    async fn insert_progress(
        &mut self,
        progress: NewProgress,
    ) -> Result<ProgressRecord, RepositoryError> {
        if self.working.latest_open_progress(&progress.student).is_some() {
            return Err(RepositoryError::Conflict);
        }
        self.working.last_progress_id += 1;
        let record = progress.into_record(ProgressId(self.working.last_progress_id));
        self.working.progress.insert(record.id, record.clone());
        Ok(record)
    }

    async fn close_progress(
        &mut self,
        id: ProgressId,
        closure: &ProgressClosure,
    ) -> Result<(), RepositoryError> {
        let record = self
            .working
            .progress
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        self.working.progress.insert(id, record.closed_with(closure));
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        let MemoryUnit { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, RepositoryError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryUnit { guard, working })
    }

    async fn delete_evaluation(&self, id: EvaluationId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        state.progress.retain(|_, record| !record.references(id));
        Ok(state.evaluations.remove(&id).is_some())
    }
}

#[async_trait]
impl StudentRepository for MemoryStore {
    async fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.students.contains_key(&student.document) {
            return Err(RepositoryError::Conflict);
        }
        state
            .students
            .insert(student.document.clone(), student.clone());
        Ok(student)
    }

    async fn fetch_student(&self, document: &str) -> Result<Option<Student>, RepositoryError> {
        Ok(self.state.lock().await.students.get(document).cloned())
    }

    async fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        let state = self.state.lock().await;
        let mut students: Vec<Student> = state.students.values().cloned().collect();
        students.sort_by(|a, b| a.name.cmp(&b.name).then(a.document.cmp(&b.document)));
        Ok(students)
    }

    async fn update_student(
        &self,
        document: &str,
        changes: &StudentChanges,
    ) -> Result<Option<Student>, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.students.get_mut(document).map(|student| {
            changes.apply_to(student);
            student.clone()
        }))
    }

    async fn delete_student(&self, document: &str) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        state.progress.retain(|_, record| record.student != document);
        state
            .evaluations
            .retain(|_, evaluation| evaluation.student != document);
        Ok(state.students.remove(document).is_some())
    }
}

#[async_trait]
impl TrackingQueries for MemoryStore {
    async fn evaluation(&self, id: EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        Ok(self.state.lock().await.evaluations.get(&id).cloned())
    }

    async fn evaluations_for(&self, document: &str) -> Result<Vec<Evaluation>, RepositoryError> {
        let state = self.state.lock().await;
        let evaluations = state
            .evaluations
            .values()
            .filter(|evaluation| evaluation.student == document)
            .cloned()
            .collect();
        Ok(MemoryState::newest_first(evaluations))
    }

    async fn evaluations(&self) -> Result<Vec<Evaluation>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(MemoryState::newest_first(
            state.evaluations.values().cloned().collect(),
        ))
    }

    async fn progress_for(&self, document: &str) -> Result<Vec<ProgressRecord>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .progress
            .values()
            .rev()
            .filter(|record| record.student == document)
            .cloned()
            .collect())
    }

    async fn progress_records(&self) -> Result<Vec<ProgressRecord>, RepositoryError> {
        Ok(self.state.lock().await.progress.values().cloned().collect())
    }
}
