use crate::cache::DEFAULT_TTL_SECS;
use crate::list_query::{DEFAULT_PER_PAGE, MAX_PER_PAGE};
use serde::Deserialize;

const MIN_API_KEY_LEN: usize = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Key a caller must present in `x-api-key` to manage prospects.
    pub manage_api_key: String,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
    pub default_per_page: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required")
                })
                .and_then(|url| validate_database_url(&url).map(|_| url))?,
            port: parse_or("PORT", 3000u16)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            manage_api_key: std::env::var("MANAGE_API_KEY")
                .map_err(|_| anyhow::anyhow!("MANAGE_API_KEY environment variable required"))
                .and_then(|key| validate_api_key(&key).map(|_| key))?,
            cache_ttl_secs: parse_or("CACHE_TTL_SECS", DEFAULT_TTL_SECS)
                .map_err(|_| anyhow::anyhow!("CACHE_TTL_SECS must be a whole number of seconds"))?,
            cache_max_entries: parse_or("CACHE_MAX_ENTRIES", 10_000u64)
                .map_err(|_| anyhow::anyhow!("CACHE_MAX_ENTRIES must be a positive number"))?,
            default_per_page: parse_or("DEFAULT_PER_PAGE", DEFAULT_PER_PAGE)
                .map_err(|_| anyhow::anyhow!("DEFAULT_PER_PAGE must be a number"))
                .and_then(|n| validate_per_page(n).map(|_| n))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Cache TTL: {}s, max entries: {}",
            config.cache_ttl_secs,
            config.cache_max_entries
        );
        tracing::debug!("Default page size: {}", config.default_per_page);

        Ok(config)
    }
}

/// Reads `name` from the environment, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, T::Err> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse(),
        _ => Ok(default),
    }
}

fn validate_database_url(url: &str) -> anyhow::Result<()> {
    if url.trim().is_empty() {
        anyhow::bail!("DATABASE_URL cannot be empty");
    }
    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
    }
    Ok(())
}

fn validate_api_key(key: &str) -> anyhow::Result<()> {
    if key.trim().len() < MIN_API_KEY_LEN {
        anyhow::bail!(
            "MANAGE_API_KEY must be at least {} characters",
            MIN_API_KEY_LEN
        );
    }
    Ok(())
}

fn validate_per_page(n: u32) -> anyhow::Result<()> {
    if n == 0 || n > MAX_PER_PAGE {
        anyhow::bail!("DEFAULT_PER_PAGE must be between 1 and {}", MAX_PER_PAGE);
    }
    Ok(())
}
