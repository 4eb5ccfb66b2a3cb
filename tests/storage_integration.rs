use std::collections::HashMap;
use std::env;

use nonprofit_backoffice::data::db::Database;
use nonprofit_backoffice::data::db_storage::{IndicatorStore, PgIndicatorStore, INDICATOR_LIST};
use nonprofit_backoffice::list_query::ListQuery;
use nonprofit_backoffice::models::NewIndicator;
use nonprofit_backoffice::services::capacity_report;

/// Integration smoke test for the Postgres indicator store.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn indicator_store_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let store = PgIndicatorStore::new(db.pool.clone());

    // Prospect id unlikely to collide with earlier runs.
    let prospect_id = 9_000_000_000 + i64::from(std::process::id());

    let house = store
        .add(&NewIndicator {
            prospect_id,
            indicator_type: "real_estate".to_string(),
            indicator_value: "$1,000,000".to_string(),
            source: Some("county assessor".to_string()),
            ..Default::default()
        })
        .await?;
    store
        .add(&NewIndicator {
            prospect_id,
            indicator_type: "family_foundation".to_string(),
            indicator_value: "Smoke Test Fund".to_string(),
            ..Default::default()
        })
        .await?;

    assert!(store.set_verified(house, true).await?);

    let indicators = store.list_for_prospect(prospect_id).await?;
    let report = capacity_report(prospect_id, &indicators);
    assert_eq!(report.capacity, 150_000.0);
    assert_eq!(report.score, 75.0);
    assert_eq!(report.verified_count, 1);

    let params: HashMap<String, String> = [
        ("prospect_id".to_string(), prospect_id.to_string()),
        ("verified".to_string(), "true".to_string()),
    ]
    .into_iter()
    .collect();
    let query = ListQuery::parse(&INDICATOR_LIST, &params, 20)?;
    let (rows, total) = store.list(&query).await?;
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, house);

    for indicator in indicators {
        store.delete(indicator.id).await?;
    }
    Ok(())
}
