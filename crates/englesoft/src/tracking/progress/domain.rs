use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::tracking::evaluations::EvaluationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressId(pub i64);

impl fmt::Display for ProgressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of one initial → final cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Open,
    Closed,
}

impl ProgressState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "En Progreso",
            Self::Closed => "Completado",
        }
    }
}

/// A progress cycle. Open while `final_evaluation` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRecord {
    #[serde(rename = "id_progreso")]
    pub id: ProgressId,
    #[serde(rename = "documento_estudiante")]
    pub student: String,
    #[serde(rename = "id_evaluacion_inicial")]
    pub initial_evaluation: EvaluationId,
    #[serde(rename = "id_evaluacion_final")]
    pub final_evaluation: Option<EvaluationId>,
    #[serde(rename = "nivel_inicial")]
    pub initial_level: String,
    #[serde(rename = "nivel_final")]
    pub final_level: Option<String>,
    #[serde(rename = "mejora_puntos")]
    pub improvement: Option<i16>,
    #[serde(rename = "fecha_inicio")]
    pub started_on: NaiveDate,
    #[serde(rename = "fecha_finalizacion")]
    pub completed_on: Option<NaiveDate>,
}

impl ProgressRecord {
    pub fn state(&self) -> ProgressState {
        match self.final_evaluation {
            Some(_) => ProgressState::Closed,
            None => ProgressState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ProgressState::Open
    }

    pub fn closed_with(mut self, closure: &ProgressClosure) -> Self {
        self.final_evaluation = Some(closure.final_evaluation);
        self.final_level = Some(closure.final_level.clone());
        self.improvement = Some(closure.improvement);
        self.completed_on = Some(closure.completed_on);
        self
    }

    /// Days between start and completion; `None` while the cycle is open.
    pub fn training_days(&self) -> Option<i64> {
        self.completed_on
            .map(|completed| (completed - self.started_on).num_days())
    }

    /// Whether the cycle references `evaluation` at either end.
    pub fn references(&self, evaluation: EvaluationId) -> bool {
        self.initial_evaluation == evaluation || self.final_evaluation == Some(evaluation)
    }
}

/// Values for a freshly opened cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProgress {
    pub student: String,
    pub initial_evaluation: EvaluationId,
    pub initial_level: String,
    pub started_on: NaiveDate,
}

impl NewProgress {
    pub fn into_record(self, id: ProgressId) -> ProgressRecord {
        ProgressRecord {
            id,
            student: self.student,
            initial_evaluation: self.initial_evaluation,
            final_evaluation: None,
            initial_level: self.initial_level,
            final_level: None,
            improvement: None,
            started_on: self.started_on,
            completed_on: None,
        }
    }
}

/// Values written when a final evaluation closes a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressClosure {
    pub final_evaluation: EvaluationId,
    pub final_level: String,
    pub improvement: i16,
    pub completed_on: NaiveDate,
}
