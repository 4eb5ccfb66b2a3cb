use crate::errors::{AppError, ResultExt};
use crate::list_query::{FilterKind, ListQuery, ListSchema};
use crate::models::{NewIndicator, WealthIndicator};
use sqlx::PgPool;
use std::future::Future;

pub const INDICATORS_TABLE: &str = "wealth_indicators";

/// What a wealth-indicator listing may sort and filter on.
pub static INDICATOR_LIST: ListSchema = ListSchema {
    module: "wealth_indicators",
    table: INDICATORS_TABLE,
    sortable: &[
        "id",
        "prospect_id",
        "indicator_type",
        "date_found",
        "verified",
        "created_at",
    ],
    default_order_by: "created_at",
    filterable: &[
        ("prospect_id", FilterKind::Int),
        ("indicator_type", FilterKind::Text),
        ("verified", FilterKind::Bool),
        ("source", FilterKind::Text),
    ],
};

/// Persistence port for wealth indicators.
///
/// Implementations own the connection handle; services receive the store
/// explicitly instead of reaching for a process-wide database.
pub trait IndicatorStore: Send + Sync {
    /// Every indicator of one prospect, in no particular order.
    fn list_for_prospect(
        &self,
        prospect_id: i64,
    ) -> impl Future<Output = Result<Vec<WealthIndicator>, AppError>> + Send;

    /// Inserts an unverified indicator and returns its id.
    fn add(&self, indicator: &NewIndicator) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn get(&self, id: i64) -> impl Future<Output = Result<Option<WealthIndicator>, AppError>> + Send;

    /// Returns false when no row has this id.
    fn set_verified(
        &self,
        id: i64,
        verified: bool,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Returns false when no row has this id.
    fn delete(&self, id: i64) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// One page of rows plus the total matching the filters.
    fn list(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<(Vec<WealthIndicator>, i64), AppError>> + Send;

    /// Distinct prospects that have at least one indicator.
    fn prospect_ids(&self) -> impl Future<Output = Result<Vec<i64>, AppError>> + Send;
}

/// Postgres-backed indicator store.
#[derive(Clone)]
pub struct PgIndicatorStore {
    pool: PgPool,
}

impl PgIndicatorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl IndicatorStore for PgIndicatorStore {
    async fn list_for_prospect(&self, prospect_id: i64) -> Result<Vec<WealthIndicator>, AppError> {
        sqlx::query_as::<_, WealthIndicator>(
            "SELECT * FROM wealth_indicators WHERE prospect_id = $1 ORDER BY id",
        )
        .bind(prospect_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("loading indicators of prospect {}", prospect_id))
    }

    async fn add(&self, indicator: &NewIndicator) -> Result<i64, AppError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO wealth_indicators
                (prospect_id, indicator_type, indicator_value, source, date_found, verified, notes)
            VALUES ($1, $2, $3, $4, $5, false, $6)
            RETURNING id
            "#,
        )
        .bind(indicator.prospect_id)
        .bind(&indicator.indicator_type)
        .bind(&indicator.indicator_value)
        .bind(&indicator.source)
        .bind(indicator.date_found)
        .bind(&indicator.notes)
        .fetch_one(&self.pool)
        .await
        .context("inserting wealth indicator")?;

        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<WealthIndicator>, AppError> {
        sqlx::query_as::<_, WealthIndicator>("SELECT * FROM wealth_indicators WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("loading indicator {}", id))
    }

    async fn set_verified(&self, id: i64, verified: bool) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE wealth_indicators SET verified = $2 WHERE id = $1")
            .bind(id)
            .bind(verified)
            .execute(&self.pool)
            .await
            .with_context(|| format!("updating verification of indicator {}", id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM wealth_indicators WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("deleting indicator {}", id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<WealthIndicator>, i64), AppError> {
        let mut select = query.select_sql();
        let rows = select
            .build_query_as::<WealthIndicator>()
            .fetch_all(&self.pool)
            .await
            .context("listing wealth indicators")?;

        let mut count = query.count_sql();
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .context("counting wealth indicators")?;

        Ok((rows, total))
    }

    async fn prospect_ids(&self) -> Result<Vec<i64>, AppError> {
        sqlx::query_scalar("SELECT DISTINCT prospect_id FROM wealth_indicators ORDER BY prospect_id")
            .fetch_all(&self.pool)
            .await
            .context("listing prospects with indicators")
    }
}
