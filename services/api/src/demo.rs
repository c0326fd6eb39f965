use crate::infra::parse_score;
use clap::Args;
use englesoft::error::{AppError, ErrorPolicy};
use englesoft::tracking::evaluations::EvaluationRequest;
use englesoft::tracking::students::{LoginRequest, RegistrationRequest};
use englesoft::tracking::{
    LevelTable, LinkagePolicy, MemoryStore, ProgressOutcome, SessionIssuer, TrackingState,
};
use std::sync::Arc;

const DEMO_PASSWORD: &str = "demo-clave";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Total score for the walkthrough's initial evaluation (0-100)
    #[arg(long, default_value_t = 35, value_parser = parse_score)]
    pub(crate) initial_score: u8,
    /// Total score for the walkthrough's final evaluation (0-100)
    #[arg(long, default_value_t = 72, value_parser = parse_score)]
    pub(crate) final_score: u8,
    /// Print the comparison and general statistics as JSON as well
    #[arg(long)]
    pub(crate) json: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            initial_score: 35,
            final_score: 72,
            json: false,
        }
    }
}

/// Runs a full training period against the in-memory store: registration, login, an initial
/// and a final evaluation, then the reports a coordinator would read.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        initial_score,
        final_score,
        json,
    } = args;

    let state = TrackingState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(LevelTable::mcer()),
        SessionIssuer::new("englesoft-demo", 30),
        LinkagePolicy::default(),
        ErrorPolicy::new(true),
    );

    println!("EnglesSoft tracking demo (in-memory store)");
    for (document, name) in [("1001", "Laura Martínez"), ("1002", "Andrés Castro")] {
        if let Err(err) = state.students.register(registration(document, name)).await {
            println!("  Registration rejected: {err}");
            return Ok(());
        }
        println!("- Registered {name} ({document})");
    }

    let login = LoginRequest {
        document: Some("1001".to_string()),
        password: Some(DEMO_PASSWORD.to_string()),
    };
    match state.students.login(login).await {
        Ok(session) => println!(
            "- Login for {} issued a session valid until {}",
            session.student.name,
            session.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
        Err(err) => println!("  Login failed: {err}"),
    }

    println!("\nEvaluations");
    for (kind, score) in [("inicial", initial_score), ("final", final_score)] {
        let recorded = match state.recorder.record(&evaluation("1001", kind, score)).await {
            Ok(recorded) => recorded,
            Err(err) => {
                println!("  {kind} evaluation rejected: {err}");
                return Ok(());
            }
        };
        println!(
            "- {kind}: total {} -> level {}",
            recorded.evaluation.total_score, recorded.evaluation.level
        );
        match &recorded.progress {
            ProgressOutcome::Opened(cycle) => {
                println!("  Opened progress cycle #{} at {}", cycle.id.0, cycle.initial_level)
            }
            ProgressOutcome::Closed(cycle) => println!(
                "  Closed progress cycle #{} with {:+} points",
                cycle.id.0,
                cycle.improvement.unwrap_or_default()
            ),
            ProgressOutcome::Unlinked { reason } => {
                println!("  Evaluation kept without a progress cycle: {reason}")
            }
        }
    }

    println!("\nProgress summary");
    let rows = match state.reports.progress_summary().await {
        Ok(rows) => rows,
        Err(err) => {
            println!("  Summary unavailable: {err}");
            return Ok(());
        }
    };
    for row in &rows {
        println!(
            "- {} ({}): {} | {} -> {}",
            row.nombres,
            row.documento,
            row.estado,
            row.nivel_inicial.as_deref().unwrap_or("-"),
            row.nivel_final.as_deref().unwrap_or("-"),
        );
    }

    let comparison = state.reports.comparison("1001").await;
    let stats = state.reports.general_stats().await;
    match (&comparison, &stats) {
        (Ok(comparison), Ok(stats)) => {
            if let Some(mejora) = &comparison.mejora {
                println!(
                    "\nLaura improved {} points (lectura {:+}, escritura {:+}, escucha {:+}, habla {:+})",
                    mejora.puntaje_total, mejora.lectura, mejora.escritura, mejora.escucha, mejora.habla
                );
            }
            println!(
                "Class: {} students | {} completed cycles | average improvement {}",
                stats.total_estudiantes, stats.progresos_completos, stats.mejora_promedio
            );
            if json {
                let payload = serde_json::json!({
                    "comparacion": comparison,
                    "estadisticas": stats,
                });
                match serde_json::to_string_pretty(&payload) {
                    Ok(text) => println!("\n{text}"),
                    Err(err) => println!("  JSON rendering failed: {err}"),
                }
            }
        }
        (Err(err), _) | (_, Err(err)) => println!("  Reports unavailable: {err}"),
    }

    Ok(())
}

fn registration(document: &str, name: &str) -> RegistrationRequest {
    RegistrationRequest {
        document: Some(document.to_string()),
        name: Some(name.to_string()),
        phone: Some("3001112233".to_string()),
        email: Some(format!("{document}@englesoft.test")),
        password: Some(DEMO_PASSWORD.to_string()),
    }
}

// Skills spread around the requested total so the comparison shows per-skill deltas.
fn evaluation(document: &str, kind: &str, score: u8) -> EvaluationRequest {
    let score = i64::from(score);
    EvaluationRequest {
        student: Some(document.to_string()),
        kind: Some(kind.to_string()),
        reading: Some(score),
        writing: Some((score - 4).max(0)),
        listening: Some((score + 4).min(100)),
        speaking: Some(score),
        notes: Some(format!("Evaluación {kind} de demostración")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_spread_stays_on_the_scale() {
        let low = evaluation("1", "inicial", 2);
        assert_eq!(low.writing, Some(0));
        let high = evaluation("1", "final", 98);
        assert_eq!(high.listening, Some(100));
    }

    #[tokio::test]
    async fn demo_runs_end_to_end() {
        run_demo(DemoArgs {
            json: true,
            ..DemoArgs::default()
        })
        .await
        .expect("demo completes");
    }
}
