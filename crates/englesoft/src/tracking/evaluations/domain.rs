use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tracking::levels::MAX_SCORE;
use crate::tracking::students::domain::filled;

/// Generated identifier of a stored evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationId(pub i64);

impl fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which end of the training period an evaluation brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationKind {
    #[serde(rename = "inicial")]
    Initial,
    #[serde(rename = "final")]
    Final,
}

impl EvaluationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "inicial",
            Self::Final => "final",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inicial" => Some(Self::Initial),
            "final" => Some(Self::Final),
            _ => None,
        }
    }
}

/// The four skill sub-scores, each within `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillScores {
    #[serde(rename = "puntaje_lectura")]
    pub reading: u8,
    #[serde(rename = "puntaje_escritura")]
    pub writing: u8,
    #[serde(rename = "puntaje_escucha")]
    pub listening: u8,
    #[serde(rename = "puntaje_habla")]
    pub speaking: u8,
}

impl SkillScores {
    pub fn new(reading: u8, writing: u8, listening: u8, speaking: u8) -> Self {
        Self {
            reading,
            writing,
            listening,
            speaking,
        }
    }

    /// Average of the four skills rounded half up, so `75.5` becomes `76`.
    pub fn total(&self) -> u8 {
        let sum = u16::from(self.reading)
            + u16::from(self.writing)
            + u16::from(self.listening)
            + u16::from(self.speaking);
        ((sum + 2) / 4) as u8
    }
}

/// Body of `POST /api/evaluaciones`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    #[serde(rename = "documento_estudiante", default)]
    pub student: Option<String>,
    #[serde(rename = "tipo_evaluacion", default)]
    pub kind: Option<String>,
    #[serde(rename = "puntaje_lectura", default)]
    pub reading: Option<i64>,
    #[serde(rename = "puntaje_escritura", default)]
    pub writing: Option<i64>,
    #[serde(rename = "puntaje_escucha", default)]
    pub listening: Option<i64>,
    #[serde(rename = "puntaje_habla", default)]
    pub speaking: Option<i64>,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

pub const REQUIRED_EVALUATION_FIELDS: &[&str] = &["documento_estudiante", "tipo_evaluacion"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationRequestError {
    #[error("Faltan campos requeridos")]
    MissingFields,
    #[error("Tipo de evaluación inválido '{0}': use 'inicial' o 'final'")]
    UnknownKind(String),
    #[error("El campo {field} debe estar entre 0 y 100 (recibido {value})")]
    ScoreOutOfRange { field: &'static str, value: i64 },
}

impl EvaluationRequest {
    pub fn validate(&self) -> Result<EvaluationSubmission, EvaluationRequestError> {
        let (Some(student), Some(raw_kind)) = (filled(&self.student), filled(&self.kind)) else {
            return Err(EvaluationRequestError::MissingFields);
        };

        let kind = EvaluationKind::parse(raw_kind)
            .ok_or_else(|| EvaluationRequestError::UnknownKind(raw_kind.to_string()))?;

        let scores = SkillScores {
            reading: skill_score("puntaje_lectura", self.reading)?,
            writing: skill_score("puntaje_escritura", self.writing)?,
            listening: skill_score("puntaje_escucha", self.listening)?,
            speaking: skill_score("puntaje_habla", self.speaking)?,
        };

        Ok(EvaluationSubmission {
            student: student.to_string(),
            kind,
            scores,
            notes: self.notes.clone().unwrap_or_default(),
        })
    }
}

fn skill_score(field: &'static str, value: Option<i64>) -> Result<u8, EvaluationRequestError> {
    match value {
        None => Ok(0),
        Some(value) if (0..=i64::from(MAX_SCORE)).contains(&value) => Ok(value as u8),
        Some(value) => Err(EvaluationRequestError::ScoreOutOfRange { field, value }),
    }
}

/// Validated request, before scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationSubmission {
    pub student: String,
    pub kind: EvaluationKind,
    pub scores: SkillScores,
    pub notes: String,
}

/// Scored evaluation ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationDraft {
    pub student: String,
    pub kind: EvaluationKind,
    pub scores: SkillScores,
    pub total_score: u8,
    pub level: String,
    pub notes: String,
    pub taken_at: DateTime<Utc>,
}

impl EvaluationDraft {
    pub fn into_evaluation(self, id: EvaluationId) -> Evaluation {
        Evaluation {
            id,
            student: self.student,
            kind: self.kind,
            scores: self.scores,
            total_score: self.total_score,
            level: self.level,
            notes: self.notes,
            taken_at: self.taken_at,
        }
    }
}

/// Stored evaluation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    #[serde(rename = "id_evaluacion")]
    pub id: EvaluationId,
    #[serde(rename = "documento_estudiante")]
    pub student: String,
    #[serde(rename = "tipo_evaluacion")]
    pub kind: EvaluationKind,
    #[serde(flatten)]
    pub scores: SkillScores,
    #[serde(rename = "puntaje_total")]
    pub total_score: u8,
    #[serde(rename = "nivel_alcanzado")]
    pub level: String,
    #[serde(rename = "observaciones")]
    pub notes: String,
    #[serde(rename = "fecha_evaluacion")]
    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_rounded_average_of_skills() {
        assert_eq!(SkillScores::new(80, 70, 90, 60).total(), 75);
        assert_eq!(SkillScores::new(80, 70, 90, 62).total(), 76);
        assert_eq!(SkillScores::new(80, 70, 90, 61).total(), 75);
        assert_eq!(SkillScores::new(100, 100, 100, 100).total(), 100);
        assert_eq!(SkillScores::default().total(), 0);
    }

    #[test]
    fn total_stays_within_bounds_for_all_inputs() {
        for reading in (0..=100).step_by(7) {
            for writing in (0..=100).step_by(11) {
                for listening in [0, 33, 99, 100] {
                    for speaking in [0, 1, 50, 100] {
                        let scores = SkillScores::new(reading, writing, listening, speaking);
                        let sum = f64::from(reading)
                            + f64::from(writing)
                            + f64::from(listening)
                            + f64::from(speaking);
                        let expected = (sum / 4.0 + 0.5).floor() as u8;
                        assert_eq!(scores.total(), expected);
                        assert!(scores.total() <= MAX_SCORE);
                    }
                }
            }
        }
    }

    #[test]
    fn missing_scores_default_to_zero() {
        let request = EvaluationRequest {
            student: Some("1001".to_string()),
            kind: Some("inicial".to_string()),
            reading: Some(80),
            ..EvaluationRequest::default()
        };
        let submission = request.validate().expect("valid request");
        assert_eq!(submission.scores, SkillScores::new(80, 0, 0, 0));
        assert_eq!(submission.scores.total(), 20);
        assert_eq!(submission.notes, "");
    }

    #[test]
    fn validation_rejects_missing_and_malformed_fields() {
        let missing = EvaluationRequest {
            student: Some("  ".to_string()),
            kind: Some("final".to_string()),
            ..EvaluationRequest::default()
        };
        assert_eq!(
            missing.validate(),
            Err(EvaluationRequestError::MissingFields)
        );

        let unknown = EvaluationRequest {
            student: Some("1001".to_string()),
            kind: Some("intermedia".to_string()),
            ..EvaluationRequest::default()
        };
        assert_eq!(
            unknown.validate(),
            Err(EvaluationRequestError::UnknownKind("intermedia".to_string()))
        );

        let out_of_range = EvaluationRequest {
            student: Some("1001".to_string()),
            kind: Some("Final".to_string()),
            speaking: Some(101),
            ..EvaluationRequest::default()
        };
        assert_eq!(
            out_of_range.validate(),
            Err(EvaluationRequestError::ScoreOutOfRange {
                field: "puntaje_habla",
                value: 101
            })
        );
    }

    #[test]
    fn evaluation_serializes_with_flattened_scores() {
        let evaluation = EvaluationDraft {
            student: "1001".to_string(),
            kind: EvaluationKind::Final,
            scores: SkillScores::new(80, 70, 90, 60),
            total_score: 75,
            level: "B2".to_string(),
            notes: String::new(),
            taken_at: Utc::now(),
        }
        .into_evaluation(EvaluationId(7));

        let value = serde_json::to_value(&evaluation).expect("serializes");
        assert_eq!(value["id_evaluacion"], 7);
        assert_eq!(value["tipo_evaluacion"], "final");
        assert_eq!(value["puntaje_escucha"], 90);
        assert_eq!(value["nivel_alcanzado"], "B2");
    }
}
