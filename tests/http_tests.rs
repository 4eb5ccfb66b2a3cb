/// HTTP routing tests
/// Drives the real route table with in-memory collaborators through `oneshot`
mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use common::{MemoryIndicatorStore, StaticGate, MANAGER_KEY};
use nonprofit_backoffice::cache::ListCache;
use nonprofit_backoffice::handlers::{self, AppState};
use nonprofit_backoffice::services::WealthIndicatorService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let state = Arc::new(AppState {
        indicators: WealthIndicatorService::new(
            MemoryIndicatorStore::default(),
            StaticGate,
            ListCache::default(),
        ),
    });
    Router::new()
        .route("/health", get(handlers::health))
        .merge(handlers::api_routes::<MemoryIndicatorStore, StaticGate>())
        .with_state(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        request = request.header("x-api-key", key);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn house(prospect_id: i64) -> Value {
    json!({
        "prospect_id": prospect_id,
        "indicator_type": "real_estate",
        "indicator_value": "$1,000,000"
    })
}

#[cfg(test)]
mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_401_and_wrong_key_is_403() {
        let app = app();

        let (status, body) =
            send(&app, Method::POST, "/api/v1/indicators", None, Some(house(1))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/indicators",
            Some("not-the-manager-key"),
            Some(house(1)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::GET, "/api/v1/indicators", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health_and_capacity_need_no_key() {
        let app = app();

        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) =
            send(&app, Method::GET, "/api/v1/prospects/42/capacity", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["capacity"], 0.0);
        assert_eq!(body["score"], 20);
    }
}

#[cfg(test)]
mod route_tests {
    use super::*;

    #[tokio::test]
    async fn test_indicator_lifecycle_status_codes() {
        let app = app();
        let key = Some(MANAGER_KEY);

        let (status, body) =
            send(&app, Method::POST, "/api/v1/indicators", key, Some(house(7))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();

        let uri = format!("/api/v1/indicators/{}", id);
        let (status, body) = send(&app, Method::GET, &uri, key, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indicator_type"], "real_estate");
        assert_eq!(body["verified"], false);

        let verify = format!("/api/v1/indicators/{}/verify", id);
        let (status, body) = send(&app, Method::POST, &verify, key, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verified"], true);

        let (status, body) =
            send(&app, Method::GET, "/api/v1/prospects/7/capacity", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["capacity"], 50_000.0);
        assert_eq!(body["score"], 60);

        let (status, body) = send(&app, Method::DELETE, &uri, key, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = send(&app, Method::GET, &uri, key, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cache_route_is_not_an_id() {
        let app = app();

        let (status, _) = send(
            &app,
            Method::DELETE,
            "/api/v1/indicators/cache",
            Some(MANAGER_KEY),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) =
            send(&app, Method::DELETE, "/api/v1/indicators/cache", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_listing_over_http() {
        let app = app();
        let key = Some(MANAGER_KEY);
        for prospect in [1, 1, 2] {
            send(&app, Method::POST, "/api/v1/indicators", key, Some(house(prospect))).await;
        }

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/v1/indicators?prospect_id=1&per_page=1&page=2",
            key,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["page"], 2);
        assert_eq!(body["per_page"], 1);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/v1/indicators?prospect_id=abc",
            key,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("prospect_id"));
    }
}
