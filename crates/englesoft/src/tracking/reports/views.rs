use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::tracking::evaluations::{Evaluation, EvaluationId, EvaluationKind};
use crate::tracking::progress::ProgressRecord;

/// Evaluation row joined with its level and, for the cross-student listings, the
/// student's name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationView {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    #[serde(rename = "nombre_nivel")]
    pub level_name: Option<String>,
    #[serde(rename = "descripcion_nivel", skip_serializing_if = "Option::is_none")]
    pub level_description: Option<String>,
    #[serde(rename = "nombre_estudiante", skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelCount {
    pub codigo: String,
    pub nombre: String,
    pub cantidad: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationStats {
    pub total_evaluaciones: usize,
    pub promedio_general: f64,
    pub por_nivel: Vec<LevelCount>,
}

/// Averages over a set of evaluations; `None` when the set is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SkillAverages {
    pub total_evaluaciones: usize,
    pub promedio_total: Option<f64>,
    pub lectura: Option<f64>,
    pub escritura: Option<f64>,
    pub escucha: Option<f64>,
    pub habla: Option<f64>,
}

/// Student average minus class average, per metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SkillDifference {
    pub promedio_total: Option<f64>,
    pub lectura: Option<f64>,
    pub escritura: Option<f64>,
    pub escucha: Option<f64>,
    pub habla: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStats {
    pub documento: String,
    pub nombres: String,
    pub estudiante: SkillAverages,
    pub clase: SkillAverages,
    pub diferencia: SkillDifference,
}

/// Latest cycle of one student with contact data, both evaluations and both levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressDetail {
    #[serde(flatten)]
    pub record: ProgressRecord,
    pub estado: &'static str,
    pub nombres: String,
    pub correo: String,
    pub telefono: String,
    pub puntaje_inicial: Option<u8>,
    pub lectura_inicial: Option<u8>,
    pub escritura_inicial: Option<u8>,
    pub escucha_inicial: Option<u8>,
    pub habla_inicial: Option<u8>,
    pub fecha_eval_inicial: Option<DateTime<Utc>>,
    pub puntaje_final: Option<u8>,
    pub lectura_final: Option<u8>,
    pub escritura_final: Option<u8>,
    pub escucha_final: Option<u8>,
    pub habla_final: Option<u8>,
    pub fecha_eval_final: Option<DateTime<Utc>>,
    pub nombre_nivel_inicial: Option<String>,
    pub desc_nivel_inicial: Option<String>,
    pub nombre_nivel_final: Option<String>,
    pub desc_nivel_final: Option<String>,
}

/// One row of the progress summary and of the CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummaryRow {
    pub documento: String,
    pub nombres: String,
    pub correo: String,
    pub nivel_inicial: Option<String>,
    pub nivel_final: Option<String>,
    pub mejora_puntos: Option<i16>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_finalizacion: Option<NaiveDate>,
    pub puntaje_inicial: Option<u8>,
    pub puntaje_final: Option<u8>,
    pub dias_formacion: Option<i64>,
    pub estado: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStats {
    pub total_estudiantes: usize,
    pub evaluaciones_iniciales: usize,
    pub evaluaciones_finales: usize,
    pub progresos_completos: usize,
    pub promedio_inicial: i64,
    pub promedio_final: i64,
    pub mejora_promedio: i64,
    pub distribucion_niveles: Vec<LevelCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonEntry {
    pub tipo: EvaluationKind,
    pub id_evaluacion: EvaluationId,
    pub puntaje_total: u8,
    pub puntaje_lectura: u8,
    pub puntaje_escritura: u8,
    pub puntaje_escucha: u8,
    pub puntaje_habla: u8,
    pub nivel_alcanzado: String,
    pub fecha_evaluacion: DateTime<Utc>,
    pub nombre_nivel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Improvement {
    pub puntaje_total: i16,
    pub lectura: i16,
    pub escritura: i16,
    pub escucha: i16,
    pub habla: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub inicial: Option<ComparisonEntry>,
    #[serde(rename = "final")]
    pub final_: Option<ComparisonEntry>,
    pub mejora: Option<Improvement>,
}
