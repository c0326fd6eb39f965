use std::collections::HashMap;

use super::views::{
    EvaluationStats, GeneralStats, LevelCount, ProgressDetail, ProgressSummaryRow, SkillAverages,
    SkillDifference, StudentStats,
};
use crate::tracking::evaluations::{Evaluation, EvaluationId, EvaluationKind};
use crate::tracking::levels::LevelTable;
use crate::tracking::progress::ProgressRecord;
use crate::tracking::students::Student;

/// State shown for students that never opened a cycle.
pub const NOT_STARTED: &str = "Sin Iniciar";

/// Evaluations per level, in ascending range order, zero counts included.
pub fn level_counts(evaluations: &[Evaluation], levels: &LevelTable) -> Vec<LevelCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for evaluation in evaluations {
        *counts.entry(evaluation.level.as_str()).or_default() += 1;
    }

    levels
        .levels()
        .iter()
        .map(|level| LevelCount {
            codigo: level.code.clone(),
            nombre: level.name.clone(),
            cantidad: counts.get(level.code.as_str()).copied().unwrap_or(0),
        })
        .collect()
}

pub fn evaluation_stats(evaluations: &[Evaluation], levels: &LevelTable) -> EvaluationStats {
    EvaluationStats {
        total_evaluaciones: evaluations.len(),
        promedio_general: mean(evaluations.iter().map(|e| f64::from(e.total_score)))
            .map(two_decimals)
            .unwrap_or(0.0),
        por_nivel: level_counts(evaluations, levels),
    }
}

pub fn skill_averages(evaluations: &[&Evaluation]) -> SkillAverages {
    let average = |score: fn(&Evaluation) -> u8| {
        mean(evaluations.iter().map(|e| f64::from(score(e)))).map(two_decimals)
    };

    SkillAverages {
        total_evaluaciones: evaluations.len(),
        promedio_total: average(|e| e.total_score),
        lectura: average(|e| e.scores.reading),
        escritura: average(|e| e.scores.writing),
        escucha: average(|e| e.scores.listening),
        habla: average(|e| e.scores.speaking),
    }
}

/// The student's averages next to the class-wide ones over `all` evaluations.
pub fn student_stats(student: &Student, all: &[Evaluation]) -> StudentStats {
    let own: Vec<&Evaluation> = all
        .iter()
        .filter(|evaluation| evaluation.student == student.document)
        .collect();
    let class: Vec<&Evaluation> = all.iter().collect();

    let estudiante = skill_averages(&own);
    let clase = skill_averages(&class);

    StudentStats {
        documento: student.document.clone(),
        nombres: student.name.clone(),
        diferencia: SkillDifference {
            promedio_total: difference(estudiante.promedio_total, clase.promedio_total),
            lectura: difference(estudiante.lectura, clase.lectura),
            escritura: difference(estudiante.escritura, clase.escritura),
            escucha: difference(estudiante.escucha, clase.escucha),
            habla: difference(estudiante.habla, clase.habla),
        },
        estudiante,
        clase,
    }
}

/// Joins a cycle with the student, its evaluations and the names of both levels.
pub fn progress_detail(
    record: &ProgressRecord,
    student: &Student,
    evaluations: &[Evaluation],
    levels: &LevelTable,
) -> ProgressDetail {
    let find = |id: Option<EvaluationId>| {
        id.and_then(|id| evaluations.iter().find(|evaluation| evaluation.id == id))
    };
    let initial = find(Some(record.initial_evaluation));
    let last = find(record.final_evaluation);
    let initial_level = levels.find(&record.initial_level);
    let final_level = record.final_level.as_deref().and_then(|code| levels.find(code));

    ProgressDetail {
        estado: record.state().label(),
        nombres: student.name.clone(),
        correo: student.email.clone(),
        telefono: student.phone.clone(),
        puntaje_inicial: initial.map(|e| e.total_score),
        lectura_inicial: initial.map(|e| e.scores.reading),
        escritura_inicial: initial.map(|e| e.scores.writing),
        escucha_inicial: initial.map(|e| e.scores.listening),
        habla_inicial: initial.map(|e| e.scores.speaking),
        fecha_eval_inicial: initial.map(|e| e.taken_at),
        puntaje_final: last.map(|e| e.total_score),
        lectura_final: last.map(|e| e.scores.reading),
        escritura_final: last.map(|e| e.scores.writing),
        escucha_final: last.map(|e| e.scores.listening),
        habla_final: last.map(|e| e.scores.speaking),
        fecha_eval_final: last.map(|e| e.taken_at),
        nombre_nivel_inicial: initial_level.map(|level| level.name.clone()),
        desc_nivel_inicial: initial_level.map(|level| level.description.clone()),
        nombre_nivel_final: final_level.map(|level| level.name.clone()),
        desc_nivel_final: final_level.map(|level| level.description.clone()),
        record: record.clone(),
    }
}

/// One row per student per cycle, students in the given order and cycles in creation
/// order. Students without cycles get a single `Sin Iniciar` row.
pub fn progress_summary(
    students: &[Student],
    progress: &[ProgressRecord],
    evaluations: &[Evaluation],
) -> Vec<ProgressSummaryRow> {
    let totals: HashMap<EvaluationId, u8> = evaluations
        .iter()
        .map(|evaluation| (evaluation.id, evaluation.total_score))
        .collect();

    let mut rows = Vec::new();
    for student in students {
        let mut cycles = progress
            .iter()
            .filter(|record| record.student == student.document)
            .peekable();

        if cycles.peek().is_none() {
            rows.push(ProgressSummaryRow {
                documento: student.document.clone(),
                nombres: student.name.clone(),
                correo: student.email.clone(),
                nivel_inicial: None,
                nivel_final: None,
                mejora_puntos: None,
                fecha_inicio: None,
                fecha_finalizacion: None,
                puntaje_inicial: None,
                puntaje_final: None,
                dias_formacion: None,
                estado: NOT_STARTED,
            });
            continue;
        }

        for record in cycles {
            rows.push(ProgressSummaryRow {
                documento: student.document.clone(),
                nombres: student.name.clone(),
                correo: student.email.clone(),
                nivel_inicial: Some(record.initial_level.clone()),
                nivel_final: record.final_level.clone(),
                mejora_puntos: record.improvement,
                fecha_inicio: Some(record.started_on),
                fecha_finalizacion: record.completed_on,
                puntaje_inicial: totals.get(&record.initial_evaluation).copied(),
                puntaje_final: record
                    .final_evaluation
                    .and_then(|id| totals.get(&id).copied()),
                dias_formacion: record.training_days(),
                estado: record.state().label(),
            });
        }
    }
    rows
}

pub fn general_stats(
    student_count: usize,
    evaluations: &[Evaluation],
    progress: &[ProgressRecord],
    levels: &LevelTable,
) -> GeneralStats {
    let totals_of = |kind: EvaluationKind| {
        evaluations
            .iter()
            .filter(move |evaluation| evaluation.kind == kind)
            .map(|evaluation| f64::from(evaluation.total_score))
    };

    GeneralStats {
        total_estudiantes: student_count,
        evaluaciones_iniciales: totals_of(EvaluationKind::Initial).count(),
        evaluaciones_finales: totals_of(EvaluationKind::Final).count(),
        progresos_completos: progress.iter().filter(|record| !record.is_open()).count(),
        promedio_inicial: whole(mean(totals_of(EvaluationKind::Initial))),
        promedio_final: whole(mean(totals_of(EvaluationKind::Final))),
        mejora_promedio: whole(mean(
            progress
                .iter()
                .filter_map(|record| record.improvement)
                .map(f64::from),
        )),
        distribucion_niveles: level_counts(evaluations, levels),
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds half up, so `-2.5` becomes `-2`; `0` when there is no data.
fn whole(value: Option<f64>) -> i64 {
    value.map(|value| (value + 0.5).floor() as i64).unwrap_or(0)
}

fn difference(own: Option<f64>, class: Option<f64>) -> Option<f64> {
    Some(two_decimals(own? - class?))
}
