use crate::db_storage::{IndicatorStore, PgIndicatorStore};
use crate::errors::AppError;
use crate::models::{CapacityReport, CreatedResponse, NewIndicator, Page, WealthIndicator};
use crate::permissions::{ApiKeyGate, Caller, PermissionGate};
use crate::services::WealthIndicatorService;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState<S = PgIndicatorStore, G = ApiKeyGate> {
    /// Wealth-indicator module, gated by the management API key in production.
    pub indicators: WealthIndicatorService<S, G>,
}

type SharedState<S, G> = State<Arc<AppState<S, G>>>;

/// Every `/api/v1` route. The caller adds state and middleware.
///
/// `/api/v1/indicators/cache` is a static segment and takes priority over
/// `/api/v1/indicators/:id`.
pub fn api_routes<S, G>() -> Router<Arc<AppState<S, G>>>
where
    S: IndicatorStore + 'static,
    G: PermissionGate + 'static,
{
    Router::new()
        .route(
            "/api/v1/indicators",
            get(list_indicators::<S, G>).post(create_indicator::<S, G>),
        )
        .route(
            "/api/v1/indicators/cache",
            delete(clear_indicator_cache::<S, G>),
        )
        .route(
            "/api/v1/indicators/:id",
            get(get_indicator::<S, G>).delete(delete_indicator::<S, G>),
        )
        .route(
            "/api/v1/indicators/:id/verify",
            post(verify_indicator::<S, G>),
        )
        .route(
            "/api/v1/prospects/:id/capacity",
            get(prospect_capacity::<S, G>),
        )
}

/// Builds the caller identity from the `x-api-key` header.
fn caller_from(headers: &HeaderMap) -> Caller {
    Caller {
        api_key: headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "nonprofit-backoffice",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1/indicators
///
/// Lists wealth indicators. Accepts `page`, `per_page` (or `offset`, `limit`),
/// `orderby`, `order` and equality filters on `prospect_id`, `indicator_type`,
/// `verified` and `source`.
pub async fn list_indicators<S: IndicatorStore, G: PermissionGate>(
    State(state): SharedState<S, G>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<WealthIndicator>>, AppError> {
    tracing::info!("GET /indicators - params: {:?}", params);

    let page = state
        .indicators
        .list_indicators(&caller_from(&headers), &params)
        .await?;

    Ok(Json(page))
}

/// POST /api/v1/indicators
pub async fn create_indicator<S: IndicatorStore, G: PermissionGate>(
    State(state): SharedState<S, G>,
    headers: HeaderMap,
    Json(payload): Json<NewIndicator>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    tracing::info!(
        "POST /indicators - prospect_id: {}, type: {}",
        payload.prospect_id,
        payload.indicator_type
    );

    let id = state
        .indicators
        .add_indicator(&caller_from(&headers), payload)
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /api/v1/indicators/:id
pub async fn get_indicator<S: IndicatorStore, G: PermissionGate>(
    State(state): SharedState<S, G>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<WealthIndicator>, AppError> {
    let indicator = state
        .indicators
        .get_indicator(&caller_from(&headers), id)
        .await?;

    Ok(Json(indicator))
}

/// POST /api/v1/indicators/:id/verify
pub async fn verify_indicator<S: IndicatorStore, G: PermissionGate>(
    State(state): SharedState<S, G>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /indicators/{}/verify", id);

    state
        .indicators
        .verify_indicator(&caller_from(&headers), id)
        .await?;

    Ok(Json(json!({ "id": id, "verified": true })))
}

/// DELETE /api/v1/indicators/:id
pub async fn delete_indicator<S: IndicatorStore, G: PermissionGate>(
    State(state): SharedState<S, G>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    tracing::info!("DELETE /indicators/{}", id);

    state
        .indicators
        .delete_indicator(&caller_from(&headers), id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/indicators/cache
pub async fn clear_indicator_cache<S: IndicatorStore, G: PermissionGate>(
    State(state): SharedState<S, G>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    state
        .indicators
        .clear_cache(&caller_from(&headers))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/prospects/:id/capacity
///
/// Scores a prospect from its current indicators. Open to any caller.
pub async fn prospect_capacity<S: IndicatorStore, G: PermissionGate>(
    State(state): SharedState<S, G>,
    Path(prospect_id): Path<i64>,
) -> Result<Json<CapacityReport>, AppError> {
    tracing::info!("GET /prospects/{}/capacity", prospect_id);

    let report = state.indicators.prospect_capacity(prospect_id).await?;

    tracing::info!(
        "Prospect {} capacity {:.2}, score {}",
        prospect_id,
        report.capacity,
        report.score
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn caller_reads_api_key_header() {
        let mut headers = HeaderMap::new();
        assert!(caller_from(&headers).api_key.is_none());

        headers.insert("x-api-key", HeaderValue::from_static("secret-key-value"));
        assert_eq!(
            caller_from(&headers).api_key.as_deref(),
            Some("secret-key-value")
        );
    }
}
