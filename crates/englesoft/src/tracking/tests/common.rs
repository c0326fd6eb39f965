use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use crate::error::ErrorPolicy;
use crate::tracking::evaluations::{
    Evaluation, EvaluationDraft, EvaluationId, EvaluationKind, EvaluationRecorder,
    EvaluationRequest, LinkagePolicy, SkillScores,
};
use crate::tracking::levels::LevelTable;
use crate::tracking::progress::{NewProgress, ProgressClosure, ProgressId, ProgressRecord};
use crate::tracking::store::{
    MemoryStore, MemoryUnit, RepositoryError, StudentRepository, TrackingQueries,
    TrackingStore, TrackingUnit,
};
use crate::tracking::students::credentials::hash_password;
use crate::tracking::students::{SessionIssuer, Student, StudentChanges};
use crate::tracking::{tracking_router, TrackingState};

pub(super) const ANA: &str = "1001";
pub(super) const BRUNO: &str = "1002";
pub(super) const PASSWORD: &str = "clave-segura";

pub(super) fn levels() -> Arc<LevelTable> {
    Arc::new(LevelTable::mcer())
}

pub(super) fn student(document: &str, name: &str) -> Student {
    Student {
        document: document.to_string(),
        name: name.to_string(),
        phone: "3001234567".to_string(),
        email: format!("{document}@sena.edu.co"),
        credential: hash_password(PASSWORD).expect("hash password"),
        registered_at: Utc::now(),
    }
}

pub(super) async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (document, name) in [(ANA, "Ana Gómez"), (BRUNO, "Bruno Díaz")] {
        store
            .insert_student(student(document, name))
            .await
            .expect("seed student");
    }
    store
}

pub(super) fn request(document: &str, kind: &str, scores: [i64; 4]) -> EvaluationRequest {
    EvaluationRequest {
        student: Some(document.to_string()),
        kind: Some(kind.to_string()),
        reading: Some(scores[0]),
        writing: Some(scores[1]),
        listening: Some(scores[2]),
        speaking: Some(scores[3]),
        notes: None,
    }
}

pub(super) fn recorder<S>(store: Arc<S>, policy: LinkagePolicy) -> EvaluationRecorder<S>
where
    S: TrackingStore + 'static,
{
    EvaluationRecorder::new(store, levels(), policy)
}

pub(super) fn evaluation(
    id: i64,
    document: &str,
    kind: EvaluationKind,
    scores: SkillScores,
    days_ago: i64,
) -> Evaluation {
    let levels = LevelTable::mcer();
    let total_score = scores.total();
    EvaluationDraft {
        student: document.to_string(),
        kind,
        scores,
        total_score,
        level: levels.resolve(total_score).to_string(),
        notes: String::new(),
        taken_at: Utc::now() - Duration::days(days_ago),
    }
    .into_evaluation(EvaluationId(id))
}

pub(super) fn router_with(store: Arc<MemoryStore>) -> Router {
    let state = TrackingState::new(
        store,
        levels(),
        SessionIssuer::new("test-secret", 30),
        LinkagePolicy::default(),
        ErrorPolicy::new(true),
    );
    tracking_router(state)
}

/// Sends one request through the router and decodes the JSON body.
pub(super) async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Store whose progress table is unreachable; everything else is delegated to memory.
#[derive(Debug, Clone, Default)]
pub(super) struct ProgressOfflineStore {
    inner: MemoryStore,
}

impl ProgressOfflineStore {
    pub(super) async fn seeded() -> Arc<Self> {
        let store = Self::default();
        store
            .insert_student(student(ANA, "Ana Gómez"))
            .await
            .expect("seed student");
        Arc::new(store)
    }
}

pub(super) struct ProgressOfflineUnit {
    inner: MemoryUnit,
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("progress table offline".to_string())
}

#[async_trait]
impl TrackingUnit for ProgressOfflineUnit {
    async fn student_exists(&mut self, document: &str) -> Result<bool, RepositoryError> {
        self.inner.student_exists(document).await
    }

    async fn insert_evaluation(
        &mut self,
        draft: EvaluationDraft,
    ) -> Result<Evaluation, RepositoryError> {
        self.inner.insert_evaluation(draft).await
    }

    async fn evaluation_total(&mut self, id: EvaluationId) -> Result<Option<u8>, RepositoryError> {
        self.inner.evaluation_total(id).await
    }

    async fn latest_open_progress(
        &mut self,
        _document: &str,
    ) -> Result<Option<ProgressRecord>, RepositoryError> {
        Err(offline())
    }

    async fn insert_progress(
        &mut self,
        _progress: NewProgress,
    ) -> Result<ProgressRecord, RepositoryError> {
        Err(offline())
    }

    async fn close_progress(
        &mut self,
        _id: ProgressId,
        _closure: &ProgressClosure,
    ) -> Result<(), RepositoryError> {
        Err(offline())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.inner.commit().await
    }
}

#[async_trait]
impl TrackingStore for ProgressOfflineStore {
    type Unit = ProgressOfflineUnit;

    async fn begin(&self) -> Result<ProgressOfflineUnit, RepositoryError> {
        Ok(ProgressOfflineUnit {
            inner: self.inner.begin().await?,
        })
    }

    async fn delete_evaluation(&self, id: EvaluationId) -> Result<bool, RepositoryError> {
        self.inner.delete_evaluation(id).await
    }
}

#[async_trait]
impl StudentRepository for ProgressOfflineStore {
    async fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        self.inner.insert_student(student).await
    }

    async fn fetch_student(&self, document: &str) -> Result<Option<Student>, RepositoryError> {
        self.inner.fetch_student(document).await
    }

    async fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        self.inner.list_students().await
    }

    async fn update_student(
        &self,
        document: &str,
        changes: &StudentChanges,
    ) -> Result<Option<Student>, RepositoryError> {
        self.inner.update_student(document, changes).await
    }

    async fn delete_student(&self, document: &str) -> Result<bool, RepositoryError> {
        self.inner.delete_student(document).await
    }
}

#[async_trait]
impl TrackingQueries for ProgressOfflineStore {
    async fn evaluation(&self, id: EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        self.inner.evaluation(id).await
    }

    async fn evaluations_for(&self, document: &str) -> Result<Vec<Evaluation>, RepositoryError> {
        self.inner.evaluations_for(document).await
    }

    async fn evaluations(&self) -> Result<Vec<Evaluation>, RepositoryError> {
        self.inner.evaluations().await
    }

    async fn progress_for(&self, _document: &str) -> Result<Vec<ProgressRecord>, RepositoryError> {
        Err(offline())
    }

    async fn progress_records(&self) -> Result<Vec<ProgressRecord>, RepositoryError> {
        Err(offline())
    }
}
