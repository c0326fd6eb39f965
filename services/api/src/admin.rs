use crate::infra::{parse_score, postgres_store};
use clap::Args;
use englesoft::config::AppConfig;
use englesoft::db;
use englesoft::error::AppError;
use englesoft::telemetry;
use englesoft::tracking::reports::views::ProgressSummaryRow;
use englesoft::tracking::{LevelTable, ReportService};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct LevelArgs {
    /// Total score to classify (0-100)
    #[arg(value_parser = parse_score)]
    pub(crate) score: u8,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Destination CSV file for the progress summary
    #[arg(long)]
    pub(crate) out: PathBuf,
}

pub(crate) async fn run_migrations() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;
    info!("schema migrations applied");
    Ok(())
}

pub(crate) fn run_level_lookup(args: LevelArgs) -> Result<(), AppError> {
    let table = LevelTable::mcer();
    let code = table.resolve(args.score);
    match table.find(code) {
        Some(level) => {
            println!(
                "{} -> {} {} [{}-{}]",
                args.score, level.code, level.name, level.min_score, level.max_score
            );
            if !level.description.is_empty() {
                println!("  {}", level.description);
            }
        }
        None => println!("{} -> {code}", args.score),
    }
    Ok(())
}

pub(crate) async fn run_report_export(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let (store, levels) = postgres_store(&config).await?;
    let reports = ReportService::new(store, levels);
    let rows = reports.progress_summary().await?;

    let file = File::create(&args.out)?;
    let written = write_progress_csv(&rows, file)?;
    info!(rows = written, path = %args.out.display(), "progress summary exported");
    println!("Exported {written} rows to {}", args.out.display());
    Ok(())
}

/// Writes the summary with a header row; returns the number of data rows.
pub(crate) fn write_progress_csv<W: Write>(
    rows: &[ProgressSummaryRow],
    writer: W,
) -> Result<usize, AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(rows.len())
}
