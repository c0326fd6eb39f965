use std::sync::Arc;

use super::common::*;
use crate::tracking::evaluations::{
    EvaluationError, EvaluationRecorder, LinkagePolicy, ProgressLinkage,
};
use crate::tracking::levels::{Level, LevelTable};
use crate::tracking::progress::{
    NewProgress, ProgressError, ProgressId, ProgressOutcome, ProgressState,
};
use crate::tracking::store::{RepositoryError, TrackingQueries, TrackingStore};

fn all_required() -> LinkagePolicy {
    LinkagePolicy {
        initial: ProgressLinkage::Required,
        final_: ProgressLinkage::Required,
    }
}

fn all_best_effort() -> LinkagePolicy {
    LinkagePolicy {
        initial: ProgressLinkage::BestEffort,
        final_: ProgressLinkage::BestEffort,
    }
}

#[tokio::test]
async fn initial_evaluation_opens_a_cycle() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), LinkagePolicy::default());

    let recorded = recorder
        .record(&request(ANA, "inicial", [40, 40, 40, 40]))
        .await
        .expect("record initial");

    assert_eq!(recorded.evaluation.total_score, 40);
    assert_eq!(recorded.evaluation.level, "A2");
    let ProgressOutcome::Opened(record) = &recorded.progress else {
        panic!("expected an opened cycle, got {:?}", recorded.progress);
    };
    assert_eq!(record.initial_evaluation, recorded.evaluation.id);
    assert_eq!(record.initial_level, "A2");
    assert_eq!(record.state(), ProgressState::Open);

    let cycles = store.progress_for(ANA).await.expect("query");
    assert_eq!(cycles.len(), 1);
    assert_eq!(&cycles[0], record);
}

#[tokio::test]
async fn final_evaluation_closes_the_cycle_with_the_score_delta() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), LinkagePolicy::default());

    recorder
        .record(&request(ANA, "inicial", [40, 40, 40, 40]))
        .await
        .expect("record initial");
    let recorded = recorder
        .record(&request(ANA, "final", [80, 70, 90, 60]))
        .await
        .expect("record final");

    assert_eq!(recorded.evaluation.total_score, 75);
    assert_eq!(recorded.evaluation.level, "B2");
    let ProgressOutcome::Closed(record) = &recorded.progress else {
        panic!("expected a closed cycle, got {:?}", recorded.progress);
    };
    assert_eq!(record.final_evaluation, Some(recorded.evaluation.id));
    assert_eq!(record.final_level.as_deref(), Some("B2"));
    assert_eq!(record.improvement, Some(35));
    assert!(record.completed_on.is_some());

    let stored = store.progress_records().await.expect("query");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].state(), ProgressState::Closed);
    assert_eq!(stored[0].improvement, Some(35));
}

#[tokio::test]
async fn improvement_can_be_negative() {
    let store = seeded_store().await;
    let recorder = recorder(store, LinkagePolicy::default());

    recorder
        .record(&request(ANA, "inicial", [70, 70, 70, 70]))
        .await
        .expect("record initial");
    let recorded = recorder
        .record(&request(ANA, "final", [50, 50, 50, 50]))
        .await
        .expect("record final");

    assert_eq!(recorded.progress.record().and_then(|r| r.improvement), Some(-20));
}

#[tokio::test]
async fn required_final_without_open_cycle_stores_nothing() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), LinkagePolicy::default());

    let err = recorder
        .record(&request(ANA, "final", [80, 70, 90, 60]))
        .await
        .expect_err("no open cycle");

    assert!(matches!(
        err,
        EvaluationError::Progress(ProgressError::NoOpenCycle)
    ));
    assert_eq!(
        err.to_string(),
        "No existe evaluación inicial para este estudiante"
    );
    assert!(store.evaluations().await.expect("query").is_empty());
    assert!(store.progress_records().await.expect("query").is_empty());
}

#[tokio::test]
async fn best_effort_final_without_open_cycle_keeps_the_evaluation() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), all_best_effort());

    let recorded = recorder
        .record(&request(ANA, "final", [80, 70, 90, 60]))
        .await
        .expect("evaluation is kept");

    assert_eq!(
        recorded.progress,
        ProgressOutcome::Unlinked {
            reason: "No existe evaluación inicial para este estudiante".to_string()
        }
    );
    assert_eq!(store.evaluations().await.expect("query").len(), 1);
    assert!(store.progress_records().await.expect("query").is_empty());
}

#[tokio::test]
async fn second_initial_is_unlinked_under_the_default_policy() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), LinkagePolicy::default());

    recorder
        .record(&request(ANA, "inicial", [40, 40, 40, 40]))
        .await
        .expect("first initial");
    let second = recorder
        .record(&request(ANA, "inicial", [50, 50, 50, 50]))
        .await
        .expect("second initial is stored");

    assert!(matches!(second.progress, ProgressOutcome::Unlinked { .. }));
    assert_eq!(store.evaluations_for(ANA).await.expect("query").len(), 2);
    assert_eq!(store.progress_for(ANA).await.expect("query").len(), 1);
}

#[tokio::test]
async fn second_initial_fails_when_linkage_is_required() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), all_required());

    recorder
        .record(&request(ANA, "inicial", [40, 40, 40, 40]))
        .await
        .expect("first initial");
    let err = recorder
        .record(&request(ANA, "inicial", [50, 50, 50, 50]))
        .await
        .expect_err("cycle already open");

    assert!(matches!(
        err,
        EvaluationError::Progress(ProgressError::CycleAlreadyOpen)
    ));
    assert_eq!(store.evaluations_for(ANA).await.expect("query").len(), 1);
}

#[tokio::test]
async fn consecutive_cycles_close_in_turn() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), LinkagePolicy::default());

    for (kind, score) in [("inicial", 20), ("final", 40), ("inicial", 50), ("final", 90)] {
        recorder
            .record(&request(ANA, kind, [score; 4]))
            .await
            .expect("record");
    }

    let cycles = store.progress_for(ANA).await.expect("query");
    assert_eq!(cycles.len(), 2);
    assert!(cycles.iter().all(|cycle| !cycle.is_open()));
    assert_eq!(cycles[0].improvement, Some(40));
    assert_eq!(cycles[1].improvement, Some(20));
}

#[tokio::test]
async fn closing_picks_the_most_recent_open_cycle() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), LinkagePolicy::default());

    recorder
        .record(&request(ANA, "inicial", [20; 4]))
        .await
        .expect("first initial");
    let second = recorder
        .record(&request(ANA, "inicial", [50; 4]))
        .await
        .expect("second initial is kept unlinked");
    assert!(matches!(second.progress, ProgressOutcome::Unlinked { .. }));

    store
        .seed_progress(
            NewProgress {
                student: ANA.to_string(),
                initial_evaluation: second.evaluation.id,
                initial_level: second.evaluation.level.clone(),
                started_on: second.evaluation.taken_at.date_naive(),
            }
            .into_record(ProgressId(2)),
        )
        .await;

    let closed = recorder
        .record(&request(ANA, "final", [90; 4]))
        .await
        .expect("final");
    let ProgressOutcome::Closed(record) = &closed.progress else {
        panic!("expected a closed cycle, got {:?}", closed.progress);
    };
    assert_eq!(record.id, ProgressId(2));
    assert_eq!(record.improvement, Some(40));

    let cycles = store.progress_for(ANA).await.expect("query");
    let first = cycles
        .iter()
        .find(|cycle| cycle.id == ProgressId(1))
        .expect("first cycle");
    assert!(first.is_open());
}

#[tokio::test]
async fn unknown_students_are_rejected_before_writing() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), LinkagePolicy::default());

    let err = recorder
        .record(&request("9999", "inicial", [40, 40, 40, 40]))
        .await
        .expect_err("unknown student");

    assert!(matches!(err, EvaluationError::UnknownStudent(ref doc) if doc == "9999"));
    assert!(store.evaluations().await.expect("query").is_empty());
}

#[tokio::test]
async fn progress_outage_respects_the_linkage_policy() {
    let store = ProgressOfflineStore::seeded().await;
    let recorder = recorder(store.clone(), LinkagePolicy::default());

    let initial = recorder
        .record(&request(ANA, "inicial", [40, 40, 40, 40]))
        .await
        .expect("best effort keeps the evaluation");
    let ProgressOutcome::Unlinked { reason } = &initial.progress else {
        panic!("expected unlinked outcome, got {:?}", initial.progress);
    };
    assert!(reason.contains("progress table offline"));

    let err = recorder
        .record(&request(ANA, "final", [80, 80, 80, 80]))
        .await
        .expect_err("required linkage fails");
    assert!(matches!(
        err,
        EvaluationError::Progress(ProgressError::Repository(RepositoryError::Unavailable(_)))
    ));

    let stored = store.evaluations().await.expect("query");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, initial.evaluation.id);
}

#[tokio::test]
async fn deleting_an_initial_evaluation_removes_its_cycle() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), LinkagePolicy::default());

    let initial = recorder
        .record(&request(ANA, "inicial", [40, 40, 40, 40]))
        .await
        .expect("record initial");

    assert!(recorder.delete(initial.evaluation.id).await.expect("delete"));
    assert!(!recorder.delete(initial.evaluation.id).await.expect("delete again"));
    assert!(store.progress_for(ANA).await.expect("query").is_empty());

    let reopened = recorder
        .record(&request(ANA, "inicial", [45, 45, 45, 45]))
        .await
        .expect("record initial again");
    assert!(matches!(reopened.progress, ProgressOutcome::Opened(_)));
}

#[tokio::test]
async fn recorder_resolves_levels_against_the_injected_table() {
    let table = LevelTable::new(vec![
        Level::new("A2", "Básico", "", 0, 39),
        Level::new("B1", "Intermedio", "", 40, 69),
        Level::new("B2", "Intermedio alto", "", 70, 89),
        Level::new("C1", "Avanzado", "", 90, 100),
    ])
    .expect("valid table");
    let store = seeded_store().await;
    let recorder = EvaluationRecorder::new(store, Arc::new(table), LinkagePolicy::default());

    let recorded = recorder
        .record(&request(ANA, "inicial", [80, 70, 90, 60]))
        .await
        .expect("record");

    assert_eq!(recorded.evaluation.total_score, 75);
    assert_eq!(recorded.evaluation.level, "B2");
}

#[tokio::test]
async fn units_are_released_after_each_recording() {
    let store = seeded_store().await;
    let recorder = recorder(store.clone(), all_best_effort());

    recorder
        .record(&request(BRUNO, "inicial", [10, 10, 10, 10]))
        .await
        .expect("record");

    // a leaked unit would keep the memory store locked here
    let unit = store.begin().await.expect("begin");
    drop(unit);
}
