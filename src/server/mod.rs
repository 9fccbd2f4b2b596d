//! HTTP server: state, routes and startup.

pub mod handlers;
pub mod request;

use crate::ai::Summarizer;
use crate::config::{DataConfig, ServerConfig};
use crate::store::RecordStore;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub summarizer: Summarizer,
    pub data: Arc<DataConfig>,
}

impl AppState {
    pub fn new(store: RecordStore, summarizer: Summarizer, data: DataConfig) -> Self {
        Self {
            store,
            summarizer,
            data: Arc::new(data),
        }
    }
}

/// Create the API router.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let upload_limit = DefaultBodyLimit::max(config.max_upload_bytes);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/analyze",
            post(handlers::analyze).layer(upload_limit.clone()),
        )
        .route("/api/analyze/", post(handlers::analyze).layer(upload_limit))
        .route("/api/reload", post(handlers::reload))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Bind and serve until the process is stopped.
pub async fn run_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let router = create_router(state, config);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await.context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{Reply, StubGenerator};
    use crate::ai::{SummarizerConfig, FAILURE_MESSAGE};
    use crate::models::Record;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const UNKNOWN_LOCATION_SUMMARY: &str =
        "__error__The location/area you entered is not available in our database";

    fn row(id: u64, location: &str, year: i32, rate: f64) -> Record {
        Record {
            id,
            final_location: location.to_string(),
            year,
            flat_weighted_avg_rate: rate,
            ..Default::default()
        }
    }

    fn test_state(reply: Reply, data: DataConfig) -> (AppState, Arc<StubGenerator>) {
        let store = RecordStore::with_records(vec![
            row(1, "Andheri", 2020, 20000.0),
            row(2, "Andheri", 2021, 22000.0),
            row(3, "Bandra", 2020, 40000.0),
            row(4, "Bandra", 2022, 44000.0),
            row(5, "Wakad", 2021, 7000.0),
        ]);
        let stub = Arc::new(StubGenerator::new(reply));
        let summarizer = Summarizer::new(stub.clone(), SummarizerConfig::default());
        (AppState::new(store, summarizer, data), stub)
    }

    fn app() -> Router {
        let (state, _) = test_state(Reply::Fail, DataConfig::default());
        create_router(state, &ServerConfig::default())
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .method("POST")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_single_area_query() {
        let (status, body) =
            post_json(app(), "/api/analyze/", json!({"query": "Price trend for Andheri"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "Analysis for 'Andheri': ₹21,000.00 per sqft.");
        assert_eq!(body["chart_data"]["title"], "Price Trend for Andheri");
        assert_eq!(body["chart_data"]["labels"], json!([2020, 2021]));
        assert_eq!(body["chart_data"]["datasets"].as_array().unwrap().len(), 1);
        assert_eq!(body["chart_data"]["datasets"][0]["borderColor"], "#4f46e5");
        assert_eq!(body["table_data"].as_array().unwrap().len(), 2);
        assert_eq!(body["table_data"][0]["final_location"], "Andheri");
    }

    #[tokio::test]
    async fn test_compare_query() {
        let (status, body) = post_json(
            app(),
            "/api/analyze",
            json!({"query": "compare andheri and bandra"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let chart = &body["chart_data"];
        assert_eq!(chart["title"], "Price Comparison: Andheri vs Bandra");
        assert_eq!(chart["labels"], json!([2020, 2021, 2022]));
        assert_eq!(chart["datasets"][0]["label"], "Andheri");
        assert_eq!(chart["datasets"][1]["label"], "Bandra");
        assert_eq!(chart["datasets"][1]["data"], json!([40000.0, 44000.0]));
        assert_eq!(body["table_data"].as_array().unwrap().len(), 4);
        assert_eq!(
            body["summary"],
            "Analysis for 'compare andheri and bandra'. Andheri: ₹21,000.00 per sqft | Bandra: ₹42,000.00 per sqft"
        );
    }

    #[tokio::test]
    async fn test_unknown_location_is_soft_error() {
        let (status, body) =
            post_json(app(), "/api/analyze/", json!({"query": "xyz-unknown-place"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], UNKNOWN_LOCATION_SUMMARY);
        assert!(body["chart_data"].is_null());
        assert_eq!(body["table_data"], json!([]));
    }

    #[tokio::test]
    async fn test_missing_query_is_soft_error() {
        let (status, body) = post_json(app(), "/api/analyze/", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], UNKNOWN_LOCATION_SUMMARY);
    }

    #[tokio::test]
    async fn test_ai_summary_uses_generator() {
        let (state, stub) = test_state(
            Reply::Text("Wakad is affordable.".to_string()),
            DataConfig::default(),
        );
        let (_, body) = post_json(
            create_router(state, &ServerConfig::default()),
            "/api/analyze/",
            json!({"query": "WAKAD", "use_ai": true}),
        )
        .await;

        assert_eq!(body["summary"], "Wakad is affordable.");
        assert_eq!(body["chart_data"]["title"], "Price Trend for Wakad");

        let requests = stub.requests.lock().unwrap();
        assert!(requests[0].prompt.ends_with("for the query: 'wakad'"));
    }

    #[tokio::test]
    async fn test_ai_failure_does_not_fall_back_to_template() {
        let (_, body) = post_json(
            app(),
            "/api/analyze/",
            json!({"query": "wakad", "use_ai": true}),
        )
        .await;

        assert_eq!(body["summary"], FAILURE_MESSAGE);
        assert_eq!(body["table_data"].as_array().unwrap().len(), 1);
    }

    const BOUNDARY: &str = "propstat-test-boundary";

    fn multipart_request(query: &str, file: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\n{q}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"use_ai\"\r\n\r\nfalse\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"extra.xlsx\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            b = BOUNDARY,
            q = query
        )
        .into_bytes();
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .uri("/api/analyze/")
            .method("POST")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_multipart_request_with_file() {
        let request = multipart_request("bandra", b"not-really-a-workbook");

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["summary"], "Analysis for 'Bandra': ₹42,000.00 per sqft.");
    }

    #[tokio::test]
    async fn test_multipart_accepts_upload_over_two_megabytes() {
        let file = vec![b'x'; 3 * 1024 * 1024];
        let response = app()
            .oneshot(multipart_request("bandra", &file))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["summary"], "Analysis for 'Bandra': ₹42,000.00 per sqft.");
    }

    #[tokio::test]
    async fn test_upload_over_configured_limit_is_rejected() {
        let (state, _) = test_state(Reply::Fail, DataConfig::default());
        let config = ServerConfig {
            max_upload_bytes: 1024,
            ..Default::default()
        };
        let file = vec![b'x'; 4096];

        let response = create_router(state, &config)
            .oneshot(multipart_request("bandra", &file))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let request = Request::builder()
            .uri("/api/analyze/")
            .method("POST")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsupported_content_type() {
        let request = Request::builder()
            .uri("/api/analyze/")
            .method("POST")
            .header("Content-Type", "text/plain")
            .body(Body::from("andheri"))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_health_reports_table() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["records"], 5);
        assert_eq!(body["locations"], 3);
    }

    #[tokio::test]
    async fn test_reload_failure_reported_in_body() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = DataConfig {
            spreadsheet: dir.path().join("missing.xlsx"),
            ..Default::default()
        };
        let (state, _) = test_state(Reply::Fail, data);
        let store = state.store.clone();

        let (status, body) = post_json(create_router(state, &ServerConfig::default()), "/api/reload", json!({})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Error loading data: "));
        assert_eq!(store.len().await, 5);
    }
}
