use super::views::{Comparison, ComparisonEntry, Improvement};
use crate::tracking::evaluations::{Evaluation, EvaluationId, EvaluationKind};
use crate::tracking::levels::LevelTable;
use crate::tracking::progress::ProgressRecord;

/// Initial-vs-final comparison for one student.
///
/// `cycles` and `evaluations` belong to the student, newest first. The newest closed cycle
/// supplies the pair. Without a closed cycle the newest cycle's initial evaluation (or the
/// latest `inicial`) is paired with the latest `final`. Returns `None` when there is nothing
/// to compare.
pub fn compare(
    cycles: &[ProgressRecord],
    evaluations: &[Evaluation],
    levels: &LevelTable,
) -> Option<Comparison> {
    let by_id = |id: EvaluationId| evaluations.iter().find(|evaluation| evaluation.id == id);
    let latest = |kind: EvaluationKind| evaluations.iter().find(|evaluation| evaluation.kind == kind);

    let closed = cycles.iter().find(|cycle| !cycle.is_open());
    let (initial, last) = match closed {
        Some(cycle) => (
            by_id(cycle.initial_evaluation),
            cycle.final_evaluation.and_then(by_id),
        ),
        None => (
            cycles
                .first()
                .and_then(|cycle| by_id(cycle.initial_evaluation))
                .or_else(|| latest(EvaluationKind::Initial)),
            latest(EvaluationKind::Final),
        ),
    };

    if initial.is_none() && last.is_none() {
        return None;
    }

    let mejora = initial.zip(last).map(|(initial, last)| improvement(initial, last));

    Some(Comparison {
        inicial: initial.map(|evaluation| entry(evaluation, levels)),
        final_: last.map(|evaluation| entry(evaluation, levels)),
        mejora,
    })
}

fn improvement(initial: &Evaluation, last: &Evaluation) -> Improvement {
    let delta = |before: u8, after: u8| i16::from(after) - i16::from(before);
    Improvement {
        puntaje_total: delta(initial.total_score, last.total_score),
        lectura: delta(initial.scores.reading, last.scores.reading),
        escritura: delta(initial.scores.writing, last.scores.writing),
        escucha: delta(initial.scores.listening, last.scores.listening),
        habla: delta(initial.scores.speaking, last.scores.speaking),
    }
}

fn entry(evaluation: &Evaluation, levels: &LevelTable) -> ComparisonEntry {
    ComparisonEntry {
        tipo: evaluation.kind,
        id_evaluacion: evaluation.id,
        puntaje_total: evaluation.total_score,
        puntaje_lectura: evaluation.scores.reading,
        puntaje_escritura: evaluation.scores.writing,
        puntaje_escucha: evaluation.scores.listening,
        puntaje_habla: evaluation.scores.speaking,
        nivel_alcanzado: evaluation.level.clone(),
        fecha_evaluacion: evaluation.taken_at,
        nombre_nivel: levels.find(&evaluation.level).map(|level| level.name.clone()),
    }
}
