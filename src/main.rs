use axum::{routing::get, Router};
use nonprofit_backoffice::cache::ListCache;
use nonprofit_backoffice::config::Config;
use nonprofit_backoffice::db::Database;
use nonprofit_backoffice::db_storage::PgIndicatorStore;
use nonprofit_backoffice::handlers::{self, AppState};
use nonprofit_backoffice::permissions::ApiKeyGate;
use nonprofit_backoffice::services::WealthIndicatorService;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool and schema, the
/// module cache, and the permission gate, then serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nonprofit_backoffice=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // List and item responses share one cache; modules are separated by key prefix.
    let cache = ListCache::new(
        Duration::from_secs(config.cache_ttl_secs),
        config.cache_max_entries,
    );
    tracing::info!(
        "Module cache initialized ({}s TTL, {} capacity)",
        config.cache_ttl_secs,
        config.cache_max_entries
    );

    let indicators = WealthIndicatorService::new(
        PgIndicatorStore::new(db.pool.clone()),
        ApiKeyGate::new(&config.manage_api_key),
        cache,
    )
    .with_default_per_page(config.default_per_page);

    let app_state = Arc::new(AppState { indicators });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let protected_routes = handlers::api_routes::<PgIndicatorStore, ApiKeyGate>()
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
