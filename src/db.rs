use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        Ok(db)
    }

    /// Creates the indicator table and its index if missing. Safe to run on every start.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS wealth_indicators (
                id BIGSERIAL PRIMARY KEY,
                prospect_id BIGINT NOT NULL,
                indicator_type VARCHAR(50) NOT NULL,
                indicator_value TEXT NOT NULL,
                source VARCHAR(255),
                date_found DATE,
                verified BOOLEAN NOT NULL DEFAULT false,
                notes TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS wealth_indicators_prospect_idx ON wealth_indicators (prospect_id)",
        )
        .execute(&self.pool)
        .await?;

        tracing::debug!("Schema check complete");
        Ok(())
    }
}
