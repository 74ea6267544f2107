use crate::collectors::system::SystemProvider;
use crate::metrics::Metrics;
use crate::{chat, snapshot};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<SystemProvider>,
    pub metrics: Arc<Metrics>,
    pub reply_delay: Duration,
    pub collect_timeout: Duration,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/stats", get(stats_handler))
        .route("/ws", get(chat::ws_handler))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn stats_handler(State(state): State<AppState>) -> Response {
    state.metrics.inc_stats_request();
    match snapshot::build_snapshot(&state.provider, state.collect_timeout, &state.metrics).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => {
            state.metrics.inc_stats_failure();
            error!(error = %err, "stats request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {err}"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            provider: Arc::new(SystemProvider::new(10)),
            metrics: Metrics::new().expect("metrics init"),
            reply_delay: Duration::from_millis(0),
            collect_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = build_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn stats_returns_json_with_category_keys() {
        let app = build_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        for key in ["cpu", "memory", "gpu", "processes", "disks", "network", "os", "uptime"] {
            assert!(body.get(key).is_some(), "missing category key {key}");
        }
    }

    #[tokio::test]
    async fn stats_allows_any_origin() {
        let app = build_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats")
                    .header("Origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .map(|v| v.to_str().unwrap()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn metrics_contains_request_counter() {
        let state = test_state();
        let metrics = state.metrics.clone();
        let app = build_router(state);
        metrics.inc_stats_request();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("sysbotd_stats_requests_total"));
    }
}
