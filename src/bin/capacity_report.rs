//! Batch report: scores every prospect that has wealth indicators.

use dotenvy::dotenv;
use nonprofit_backoffice::db::Database;
use nonprofit_backoffice::db_storage::{IndicatorStore, PgIndicatorStore};
use nonprofit_backoffice::services::capacity_report;
use std::env;

/// Main entry point for the capacity report.
///
/// Connects to the database, loads the indicators of each prospect, and prints
/// capacity and score sorted by capacity, highest first.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt::init();

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let db = Database::new(&database_url).await?;
    let store = PgIndicatorStore::new(db.pool.clone());

    let prospect_ids = store.prospect_ids().await?;
    tracing::info!("Scoring {} prospects", prospect_ids.len());

    let mut reports = Vec::with_capacity(prospect_ids.len());
    for prospect_id in prospect_ids {
        let indicators = store.list_for_prospect(prospect_id).await?;
        reports.push(capacity_report(prospect_id, &indicators));
    }
    reports.sort_by(|a, b| b.capacity.total_cmp(&a.capacity));

    println!(
        "{:>10}  {:>16}  {:>7}  {:>10}  {:>8}",
        "prospect", "capacity", "score", "indicators", "verified"
    );
    for report in &reports {
        println!(
            "{:>10}  {:>16.2}  {:>7}  {:>10}  {:>8}",
            report.prospect_id,
            report.capacity,
            report.score,
            report.indicator_count,
            report.verified_count
        );
    }

    Ok(())
}
