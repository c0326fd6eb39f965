//! MCER proficiency levels and the score → level lookup.

use serde::{Deserialize, Serialize};

/// Code returned when no configured range contains a score.
pub const FALLBACK_LEVEL: &str = "A1";

/// Highest score any skill or total can take.
pub const MAX_SCORE: u8 = 100;

/// One row of the level catalogue with its closed score range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "puntaje_minimo")]
    pub min_score: u8,
    #[serde(rename = "puntaje_maximo")]
    pub max_score: u8,
}

impl Level {
    pub fn new(code: &str, name: &str, description: &str, min_score: u8, max_score: u8) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            min_score,
            max_score,
        }
    }

    pub fn contains(&self, score: u8) -> bool {
        (self.min_score..=self.max_score).contains(&score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelTableError {
    #[error("level table is empty")]
    Empty,
    #[error("level '{code}' has an empty or inverted range {min}..={max}")]
    InvalidRange { code: String, min: u8, max: u8 },
    #[error("level '{code}' exceeds the maximum score of 100")]
    OutOfBounds { code: String },
    #[error("level code '{0}' is declared more than once")]
    DuplicateCode(String),
    #[error("levels '{first}' and '{second}' overlap")]
    Overlap { first: String, second: String },
}

/// Read-only level catalogue, sorted by range. Built once and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    levels: Vec<Level>,
}

impl LevelTable {
    pub fn new(mut levels: Vec<Level>) -> Result<Self, LevelTableError> {
        if levels.is_empty() {
            return Err(LevelTableError::Empty);
        }

        for level in &levels {
            if level.code.trim().is_empty() || level.min_score > level.max_score {
                return Err(LevelTableError::InvalidRange {
                    code: level.code.clone(),
                    min: level.min_score,
                    max: level.max_score,
                });
            }
            if level.max_score > MAX_SCORE {
                return Err(LevelTableError::OutOfBounds {
                    code: level.code.clone(),
                });
            }
        }

        levels.sort_by_key(|level| level.min_score);

        for pair in levels.windows(2) {
            if pair[1].min_score <= pair[0].max_score {
                return Err(LevelTableError::Overlap {
                    first: pair[0].code.clone(),
                    second: pair[1].code.clone(),
                });
            }
        }

        let mut codes: Vec<&str> = levels.iter().map(|level| level.code.as_str()).collect();
        codes.sort_unstable();
        if let Some(pair) = codes.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(LevelTableError::DuplicateCode(pair[0].to_string()));
        }

        Ok(Self { levels })
    }

    /// Common European Framework bands on a 0–100 scale.
    pub fn mcer() -> Self {
        Self {
            levels: vec![
                Level::new(
                    "A1",
                    "Principiante",
                    "Comprende y utiliza expresiones cotidianas de uso muy frecuente.",
                    0,
                    20,
                ),
                Level::new(
                    "A2",
                    "Elemental",
                    "Se comunica en tareas simples y cotidianas sobre temas conocidos.",
                    21,
                    40,
                ),
                Level::new(
                    "B1",
                    "Intermedio",
                    "Se desenvuelve en la mayor parte de situaciones de viaje y trabajo.",
                    41,
                    60,
                ),
                Level::new(
                    "B2",
                    "Intermedio alto",
                    "Se relaciona con hablantes nativos con fluidez y naturalidad.",
                    61,
                    80,
                ),
                Level::new(
                    "C1",
                    "Avanzado",
                    "Se expresa de forma fluida y espontánea en contextos académicos y profesionales.",
                    81,
                    90,
                ),
                Level::new(
                    "C2",
                    "Maestría",
                    "Comprende con facilidad prácticamente todo lo que oye o lee.",
                    91,
                    100,
                ),
            ],
        }
    }

    /// Code of the level whose range contains `score`, or [`FALLBACK_LEVEL`].
    pub fn resolve(&self, score: u8) -> &str {
        self.levels
            .iter()
            .find(|level| level.contains(score))
            .map(|level| level.code.as_str())
            .unwrap_or(FALLBACK_LEVEL)
    }

    pub fn find(&self, code: &str) -> Option<&Level> {
        self.levels.iter().find(|level| level.code == code)
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::mcer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coarse_table() -> LevelTable {
        LevelTable::new(vec![
            Level::new("C1", "Avanzado", "", 90, 100),
            Level::new("A2", "Elemental", "", 0, 39),
            Level::new("B2", "Intermedio alto", "", 70, 89),
            Level::new("B1", "Intermedio", "", 40, 69),
        ])
        .expect("valid table")
    }

    #[test]
    fn resolves_score_inside_range() {
        let table = coarse_table();
        assert_eq!(table.resolve(75), "B2");
        assert_eq!(table.resolve(40), "B1");
        assert_eq!(table.resolve(39), "A2");
        assert_eq!(table.resolve(100), "C1");
    }

    #[test]
    fn falls_back_when_no_range_matches() {
        let table = LevelTable::new(vec![Level::new("B1", "Intermedio", "", 40, 60)])
            .expect("valid table");
        assert_eq!(table.resolve(10), FALLBACK_LEVEL);
        assert_eq!(table.resolve(95), FALLBACK_LEVEL);
    }

    #[test]
    fn mcer_table_covers_every_score_exactly_once() {
        let table = LevelTable::mcer();
        assert!(LevelTable::new(table.levels().to_vec()).is_ok());
        for score in 0..=MAX_SCORE {
            let matches = table
                .levels()
                .iter()
                .filter(|level| level.contains(score))
                .count();
            assert_eq!(matches, 1, "score {score} should map to one level");
        }
        assert_eq!(table.resolve(0), "A1");
        assert_eq!(table.resolve(61), "B2");
        assert_eq!(table.resolve(100), "C2");
    }

    #[test]
    fn rejects_overlapping_ranges() {
        let err = LevelTable::new(vec![
            Level::new("A1", "", "", 0, 30),
            Level::new("A2", "", "", 30, 50),
        ])
        .expect_err("overlap");
        assert_eq!(
            err,
            LevelTableError::Overlap {
                first: "A1".to_string(),
                second: "A2".to_string()
            }
        );
    }

    #[test]
    fn rejects_inverted_and_out_of_bounds_ranges() {
        assert!(matches!(
            LevelTable::new(vec![Level::new("A1", "", "", 20, 10)]),
            Err(LevelTableError::InvalidRange { .. })
        ));
        assert!(matches!(
            LevelTable::new(vec![Level::new("C2", "", "", 90, 120)]),
            Err(LevelTableError::OutOfBounds { .. })
        ));
        assert!(matches!(
            LevelTable::new(Vec::new()),
            Err(LevelTableError::Empty)
        ));
    }

    #[test]
    fn rejects_duplicate_codes() {
        let err = LevelTable::new(vec![
            Level::new("B1", "", "", 0, 10),
            Level::new("B1", "", "", 11, 20),
        ])
        .expect_err("duplicate");
        assert_eq!(err, LevelTableError::DuplicateCode("B1".to_string()));
    }
}
