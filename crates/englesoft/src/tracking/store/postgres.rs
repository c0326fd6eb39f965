use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::{
    RepositoryError, StudentRepository, TrackingQueries, TrackingStore, TrackingUnit,
};
use crate::tracking::evaluations::{
    Evaluation, EvaluationDraft, EvaluationId, EvaluationKind, SkillScores,
};
use crate::tracking::levels::Level;
use crate::tracking::progress::{NewProgress, ProgressClosure, ProgressId, ProgressRecord};
use crate::tracking::students::{Student, StudentChanges};

const STUDENT_COLUMNS: &str = "documento, nombres, telefono, correo, contrasena, fecha_registro";

const EVALUATION_COLUMNS: &str = "id_evaluacion, documento_estudiante, tipo_evaluacion, \
     puntaje_total, nivel_alcanzado, puntaje_lectura, puntaje_escritura, puntaje_escucha, \
     puntaje_habla, observaciones, fecha_evaluacion";

const PROGRESS_COLUMNS: &str = "id_progreso, documento_estudiante, id_evaluacion_inicial, \
     id_evaluacion_final, nivel_inicial, nivel_final, mejora_puntos, fecha_inicio, \
     fecha_finalizacion";

/// Postgres-backed store over the schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Level catalogue in ascending range order. Read once at startup.
    pub async fn load_levels(&self) -> Result<Vec<Level>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT codigo, nombre, descripcion, puntaje_minimo, puntaje_maximo \
             FROM niveles_ingles ORDER BY puntaje_minimo",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.iter()
            .map(|row| {
                Ok(Level {
                    code: column(row, "codigo")?,
                    name: column(row, "nombre")?,
                    description: column(row, "descripcion")?,
                    min_score: score(row, "puntaje_minimo")?,
                    max_score: score(row, "puntaje_maximo")?,
                })
            })
            .collect()
    }
}

pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TrackingUnit for PgUnit {
    async fn student_exists(&mut self, document: &str) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT 1 FROM usuarios WHERE documento = $1")
            .bind(document)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
        Ok(row.is_some())
    }

    async fn insert_evaluation(
        &mut self,
        draft: EvaluationDraft,
    ) -> Result<Evaluation, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO evaluaciones
                (documento_estudiante, tipo_evaluacion, puntaje_total, nivel_alcanzado,
                 puntaje_lectura, puntaje_escritura, puntaje_escucha, puntaje_habla,
                 observaciones, fecha_evaluacion)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id_evaluacion
            "#,
        )
        .bind(&draft.student)
        .bind(draft.kind.as_str())
        .bind(i16::from(draft.total_score))
        .bind(&draft.level)
        .bind(i16::from(draft.scores.reading))
        .bind(i16::from(draft.scores.writing))
        .bind(i16::from(draft.scores.listening))
        .bind(i16::from(draft.scores.speaking))
        .bind(&draft.notes)
        .bind(draft.taken_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        let id: i64 = column(&row, "id_evaluacion")?;
        Ok(draft.into_evaluation(EvaluationId(id)))
    }

    async fn evaluation_total(&mut self, id: EvaluationId) -> Result<Option<u8>, RepositoryError> {
        let row = sqlx::query("SELECT puntaje_total FROM evaluaciones WHERE id_evaluacion = $1")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
        row.map(|row| score(&row, "puntaje_total")).transpose()
    }

    async fn latest_open_progress(
        &mut self,
        document: &str,
    ) -> Result<Option<ProgressRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progreso_estudiante \
             WHERE documento_estudiante = $1 AND id_evaluacion_final IS NULL \
             ORDER BY id_progreso DESC LIMIT 1 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(document)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
        row.as_ref().map(progress_from_row).transpose()
    }

    async fn insert_progress(
        &mut self,
        progress: NewProgress,
    ) -> Result<ProgressRecord, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO progreso_estudiante
                (documento_estudiante, id_evaluacion_inicial, nivel_inicial, fecha_inicio)
            VALUES ($1, $2, $3, $4)
            RETURNING id_progreso
            "#,
        )
        .bind(&progress.student)
        .bind(progress.initial_evaluation.0)
        .bind(&progress.initial_level)
        .bind(progress.started_on)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        let id: i64 = column(&row, "id_progreso")?;
        Ok(progress.into_record(ProgressId(id)))
    }

    async fn close_progress(
        &mut self,
        id: ProgressId,
        closure: &ProgressClosure,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE progreso_estudiante
            SET id_evaluacion_final = $2,
                nivel_final = $3,
                mejora_puntos = $4,
                fecha_finalizacion = $5
            WHERE id_progreso = $1
            "#,
        )
        .bind(id.0)
        .bind(closure.final_evaluation.0)
        .bind(&closure.final_level)
        .bind(closure.improvement)
        .bind(closure.completed_on)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await.map_err(map_db_error)
    }
}

#[async_trait]
impl TrackingStore for PgStore {
    type Unit = PgUnit;

    async fn begin(&self) -> Result<PgUnit, RepositoryError> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(PgUnit { tx })
    }

    async fn delete_evaluation(&self, id: EvaluationId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            "DELETE FROM progreso_estudiante \
             WHERE id_evaluacion_inicial = $1 OR id_evaluacion_final = $1",
        )
        .bind(id.0)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let result = sqlx::query("DELETE FROM evaluaciones WHERE id_evaluacion = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl StudentRepository for PgStore {
    async fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO usuarios (documento, nombres, telefono, correo, contrasena, fecha_registro)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&student.document)
        .bind(&student.name)
        .bind(&student.phone)
        .bind(&student.email)
        .bind(&student.credential)
        .bind(student.registered_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(student)
    }

    async fn fetch_student(&self, document: &str) -> Result<Option<Student>, RepositoryError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM usuarios WHERE documento = $1");
        let row = sqlx::query(&sql)
            .bind(document)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.as_ref().map(student_from_row).transpose()
    }

    async fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM usuarios ORDER BY nombres, documento");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(student_from_row).collect()
    }

    async fn update_student(
        &self,
        document: &str,
        changes: &StudentChanges,
    ) -> Result<Option<Student>, RepositoryError> {
        let sql = format!(
            "UPDATE usuarios SET \
                 nombres = COALESCE($2, nombres), \
                 telefono = COALESCE($3, telefono), \
                 correo = COALESCE($4, correo), \
                 contrasena = COALESCE($5, contrasena) \
             WHERE documento = $1 \
             RETURNING {STUDENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(document)
            .bind(changes.name.as_deref())
            .bind(changes.phone.as_deref())
            .bind(changes.email.as_deref())
            .bind(changes.credential.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.as_ref().map(student_from_row).transpose()
    }

    async fn delete_student(&self, document: &str) -> Result<bool, RepositoryError> {
        // evaluations and progress cascade through their foreign keys
        let result = sqlx::query("DELETE FROM usuarios WHERE documento = $1")
            .bind(document)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TrackingQueries for PgStore {
    async fn evaluation(&self, id: EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        let sql = format!("SELECT {EVALUATION_COLUMNS} FROM evaluaciones WHERE id_evaluacion = $1");
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.as_ref().map(evaluation_from_row).transpose()
    }

    async fn evaluations_for(&self, document: &str) -> Result<Vec<Evaluation>, RepositoryError> {
        let sql = format!(
            "SELECT {EVALUATION_COLUMNS} FROM evaluaciones \
             WHERE documento_estudiante = $1 \
             ORDER BY fecha_evaluacion DESC, id_evaluacion DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(document)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(evaluation_from_row).collect()
    }

    async fn evaluations(&self) -> Result<Vec<Evaluation>, RepositoryError> {
        let sql = format!(
            "SELECT {EVALUATION_COLUMNS} FROM evaluaciones \
             ORDER BY fecha_evaluacion DESC, id_evaluacion DESC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(evaluation_from_row).collect()
    }

    async fn progress_for(&self, document: &str) -> Result<Vec<ProgressRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progreso_estudiante \
             WHERE documento_estudiante = $1 ORDER BY id_progreso DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(document)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(progress_from_row).collect()
    }

    async fn progress_records(&self) -> Result<Vec<ProgressRecord>, RepositoryError> {
        let sql = format!("SELECT {PROGRESS_COLUMNS} FROM progreso_estudiante ORDER BY id_progreso");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(progress_from_row).collect()
    }
}

fn map_db_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => RepositoryError::NotFound,
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        _ => RepositoryError::Unavailable(err.to_string()),
    }
}

fn column<T>(row: &PgRow, name: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(map_db_error)
}

fn score(row: &PgRow, name: &str) -> Result<u8, RepositoryError> {
    let value: i16 = column(row, name)?;
    u8::try_from(value)
        .map_err(|_| RepositoryError::Corrupt(format!("{name} out of range: {value}")))
}

fn student_from_row(row: &PgRow) -> Result<Student, RepositoryError> {
    Ok(Student {
        document: column(row, "documento")?,
        name: column(row, "nombres")?,
        phone: column(row, "telefono")?,
        email: column(row, "correo")?,
        credential: column(row, "contrasena")?,
        registered_at: column::<DateTime<Utc>>(row, "fecha_registro")?,
    })
}

fn evaluation_from_row(row: &PgRow) -> Result<Evaluation, RepositoryError> {
    let raw_kind: String = column(row, "tipo_evaluacion")?;
    let kind = EvaluationKind::parse(&raw_kind)
        .ok_or_else(|| RepositoryError::Corrupt(format!("unknown evaluation type '{raw_kind}'")))?;

    Ok(Evaluation {
        id: EvaluationId(column(row, "id_evaluacion")?),
        student: column(row, "documento_estudiante")?,
        kind,
        scores: SkillScores {
            reading: score(row, "puntaje_lectura")?,
            writing: score(row, "puntaje_escritura")?,
            listening: score(row, "puntaje_escucha")?,
            speaking: score(row, "puntaje_habla")?,
        },
        total_score: score(row, "puntaje_total")?,
        level: column(row, "nivel_alcanzado")?,
        notes: column(row, "observaciones")?,
        taken_at: column::<DateTime<Utc>>(row, "fecha_evaluacion")?,
    })
}

fn progress_from_row(row: &PgRow) -> Result<ProgressRecord, RepositoryError> {
    Ok(ProgressRecord {
        id: ProgressId(column(row, "id_progreso")?),
        student: column(row, "documento_estudiante")?,
        initial_evaluation: EvaluationId(column(row, "id_evaluacion_inicial")?),
        final_evaluation: column::<Option<i64>>(row, "id_evaluacion_final")?.map(EvaluationId),
        initial_level: column(row, "nivel_inicial")?,
        final_level: column(row, "nivel_final")?,
        improvement: column(row, "mejora_puntos")?,
        started_on: column::<NaiveDate>(row, "fecha_inicio")?,
        completed_on: column(row, "fecha_finalizacion")?,
    })
}
