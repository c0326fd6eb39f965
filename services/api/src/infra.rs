use englesoft::config::AppConfig;
use englesoft::db;
use englesoft::error::AppError;
use englesoft::tracking::{LevelTable, PgStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Connects, migrates and loads the level table from the `niveles_ingles` rows.
///
/// An empty table falls back to the built-in MCER ranges so a fresh database still resolves
/// scores.
pub(crate) async fn postgres_store(
    config: &AppConfig,
) -> Result<(Arc<PgStore>, Arc<LevelTable>), AppError> {
    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;

    let store = PgStore::new(pool);
    let rows = store.load_levels().await?;
    let levels = if rows.is_empty() {
        warn!("niveles_ingles table is empty, falling back to the built-in MCER ranges");
        LevelTable::mcer()
    } else {
        info!(levels = rows.len(), "level table loaded");
        LevelTable::new(rows)?
    };

    Ok((Arc::new(store), Arc::new(levels)))
}

pub(crate) fn parse_score(raw: &str) -> Result<u8, String> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|score| *score <= 100)
        .ok_or_else(|| format!("'{raw}' is not a score between 0 and 100"))
}
