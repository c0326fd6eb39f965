//! End-to-end scenarios for the evaluation → progress workflow, driven through the public
//! service facades and the HTTP router backed by the in-memory store.

mod common {
    use std::sync::Arc;

    use englesoft::error::ErrorPolicy;
    use englesoft::tracking::evaluations::EvaluationRequest;
    use englesoft::tracking::students::RegistrationRequest;
    use englesoft::tracking::{
        LevelTable, LinkagePolicy, MemoryStore, SessionIssuer, TrackingState,
    };

    pub(super) fn state() -> TrackingState<MemoryStore> {
        TrackingState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(LevelTable::mcer()),
            SessionIssuer::new("integration-secret", 60),
            LinkagePolicy::default(),
            ErrorPolicy::new(false),
        )
    }

    pub(super) fn registration(document: &str, name: &str) -> RegistrationRequest {
        RegistrationRequest {
            document: Some(document.to_string()),
            name: Some(name.to_string()),
            phone: None,
            email: Some(format!("{document}@sena.edu.co")),
            password: Some("clave".to_string()),
        }
    }

    pub(super) fn evaluation(document: &str, kind: &str, score: i64) -> EvaluationRequest {
        EvaluationRequest {
            student: Some(document.to_string()),
            kind: Some(kind.to_string()),
            reading: Some(score),
            writing: Some(score),
            listening: Some(score),
            speaking: Some(score),
            notes: Some("Prueba de nivel".to_string()),
        }
    }
}

use axum::body::Body;
use axum::http::{Request, StatusCode};
use englesoft::tracking::{tracking_router, ProgressOutcome, ProgressState};
use serde_json::Value;
use tower::ServiceExt;

use common::*;

#[tokio::test]
async fn a_training_period_is_tracked_from_registration_to_report() {
    let state = state();
    state
        .students
        .register(registration("5001", "Daniela Pérez"))
        .await
        .expect("register");
    state
        .students
        .register(registration("5002", "Esteban Mora"))
        .await
        .expect("register");

    let initial = state
        .recorder
        .record(&evaluation("5001", "inicial", 30))
        .await
        .expect("initial");
    assert_eq!(initial.evaluation.level, "A2");
    assert!(matches!(initial.progress, ProgressOutcome::Opened(_)));

    let last = state
        .recorder
        .record(&evaluation("5001", "final", 65))
        .await
        .expect("final");
    let ProgressOutcome::Closed(cycle) = &last.progress else {
        panic!("expected closed cycle, got {:?}", last.progress);
    };
    assert_eq!(cycle.state(), ProgressState::Closed);
    assert_eq!(cycle.improvement, Some(35));
    assert_eq!(cycle.final_level.as_deref(), Some("B2"));

    let detail = state
        .reports
        .student_progress("5001")
        .await
        .expect("progress detail");
    assert_eq!(detail.puntaje_inicial, Some(30));
    assert_eq!(detail.puntaje_final, Some(65));
    assert_eq!(detail.estado, "Completado");

    let summary = state.reports.progress_summary().await.expect("summary");
    let states: Vec<&str> = summary.iter().map(|row| row.estado).collect();
    assert_eq!(states, ["Completado", "Sin Iniciar"]);

    let stats = state.reports.general_stats().await.expect("stats");
    assert_eq!(stats.total_estudiantes, 2);
    assert_eq!(stats.evaluaciones_iniciales, 1);
    assert_eq!(stats.evaluaciones_finales, 1);
    assert_eq!(stats.mejora_promedio, 35);

    assert!(state.students.delete("5001").await.expect("delete"));
    assert!(state
        .reports
        .progress_summary()
        .await
        .expect("summary")
        .iter()
        .all(|row| row.documento != "5001"));
}

#[tokio::test]
async fn retraining_keeps_the_completed_comparison() {
    let state = state();
    state
        .students
        .register(registration("5003", "Fabián Ruiz"))
        .await
        .expect("register");

    for (kind, score) in [("inicial", 20), ("final", 60), ("inicial", 50)] {
        state
            .recorder
            .record(&evaluation("5003", kind, score))
            .await
            .expect("record");
    }

    let comparison = state.reports.comparison("5003").await.expect("comparison");
    let mejora = comparison.mejora.expect("inicial and final are both on record");
    assert_eq!(mejora.puntaje_total, 40);
    assert_eq!(mejora.lectura, 40);
    assert_eq!(comparison.final_.map(|entry| entry.puntaje_total), Some(60));
}

#[tokio::test]
async fn unknown_routes_are_not_part_of_the_tracking_router() {
    let router = tracking_router(state());

    let response = router
        .oneshot(
            Request::get("/api/inexistente")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn evaluations_for_unknown_students_are_not_found() {
    let router = tracking_router(state());

    let response = router
        .oneshot(
            Request::post("/api/evaluaciones")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"documento_estudiante":"404","tipo_evaluacion":"final"}"#,
                ))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Estudiante no encontrado");
}
