//! HTTP API for the chat frontend.
//!
//! Endpoints (also served under `/api`):
//! - GET /health - Health check
//! - GET /models - Model catalog with EUR pricing and the current rate
//! - POST /chat - Forward a message to Claude

mod handlers;
mod types;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::catalog::{CatalogError, ModelCatalog};
use crate::claude::ChatForwarder;
use crate::config::Config;
use crate::currency::ExchangeRateCache;

pub use types::*;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ModelCatalog>,
    pub currency: Arc<ExchangeRateCache>,
    pub forwarder: ChatForwarder,
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// Wire the catalog, rate cache and forwarder from configuration.
    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        let catalog = Arc::new(ModelCatalog::new(config.models.clone())?);
        let forwarder = ChatForwarder::from_config(&config.anthropic, catalog.clone())
            .with_verbosity(config.logging.verbosity);

        Ok(Self {
            catalog,
            currency: Arc::new(ExchangeRateCache::from_config(&config.currency)),
            forwarder,
            cors_origins: config.server.cors_origins.clone(),
        })
    }
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/models", get(handlers::list_models))
        .route("/chat", post(handlers::chat))
}

/// Create the API router with the given state.
pub fn create_router_with_state(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .route("/", get(handlers::root))
        .merge(api_routes())
        .nest("/api", api_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// `*` anywhere in the list allows every origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, StatusCode};
    use axum_test::TestServer;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const DEFAULT: &str = "claude-3-haiku-20240307";

    /// Config pointing both the upstream and the rate source at `server`.
    fn test_config(server: &mockito::Server) -> Config {
        let mut config = Config::default();
        config.anthropic.api_key = Some("test-key".to_string());
        config.anthropic.api_url = format!("{}/v1/messages", server.url());
        config.currency.rate_url = format!("{}/latest?from=USD&to=EUR", server.url());
        config
    }

    fn test_server(config: &Config) -> TestServer {
        let state = AppState::from_config(config).unwrap();
        TestServer::new(create_router_with_state(state)).unwrap()
    }

    async fn mock_rate(server: &mut mockito::Server, status: usize, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/latest")
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    async fn mock_upstream_hello(server: &mut mockito::Server) -> mockito::Mock {
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "content": [{"type": "text", "text": "hello"}],
                    "usage": {"input_tokens": 5, "output_tokens": 3}
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let server = mockito::Server::new_async().await;
        let app = test_server(&test_config(&server));

        let response = app.get("/health").await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "app": "my-claude",
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        }));
    }

    #[tokio::test]
    async fn routes_are_also_served_under_api_prefix() {
        let server = mockito::Server::new_async().await;
        let app = test_server(&test_config(&server));

        app.get("/api/health").await.assert_status_ok();
        let root: serde_json::Value = app.get("/").await.json();
        assert_eq!(root["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn list_models_returns_sorted_catalog_with_rate() {
        let mut server = mockito::Server::new_async().await;
        let _rate = mock_rate(&mut server, 200, r#"{"rates": {"EUR": 0.5}}"#).await;
        let app = test_server(&test_config(&server));

        let response = app.get("/models").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["usd_to_eur_rate"], 0.5);
        assert!(body["rate_updated_at"].is_string());

        let ids: Vec<&str> = body["models"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(
            ids,
            vec![
                "claude-3-5-haiku-20241022",
                "claude-3-7-sonnet-20250219",
                "claude-3-haiku-20240307",
                "claude-3-5-sonnet-20241022",
                "claude-3-opus-20240229",
            ]
        );
        assert_eq!(body["models"][1]["pricing"]["output"], 15.0);
        assert_eq!(body["models"][1]["pricing_eur"]["output"], 7.5);
    }

    #[tokio::test]
    async fn list_models_survives_rate_source_failure() {
        let mut server = mockito::Server::new_async().await;
        let _rate = mock_rate(&mut server, 500, "oops").await;
        let app = test_server(&test_config(&server));

        let response = app.get("/models").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["usd_to_eur_rate"], crate::config::DEFAULT_USD_TO_EUR_RATE);
        assert!(body.get("rate_updated_at").is_none());
    }

    #[tokio::test]
    async fn chat_round_trip_appends_two_messages() {
        let mut server = mockito::Server::new_async().await;
        let upstream = mock_upstream_hello(&mut server).await;
        let _rate = mock_rate(&mut server, 200, r#"{"rates": {"EUR": 1.0}}"#).await;
        let app = test_server(&test_config(&server));

        let response = app
            .post("/chat")
            .json(&json!({"message": "hi", "conversation_history": []}))
            .await;

        upstream.assert_async().await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["response"], "hello");
        assert_eq!(body["model_used"], DEFAULT);
        assert_eq!(body["token_usage"], json!({"input_tokens": 5, "output_tokens": 3}));

        let history = body["conversation_history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["role"], "user");
        assert_eq!(history[0]["content"], "hi");
        assert!(history[0].get("model").is_none());
        assert_eq!(history[1]["role"], "assistant");
        assert_eq!(history[1]["content"], "hello");
        assert_eq!(history[1]["model"], DEFAULT);

        // 5 * 0.25 + 3 * 1.25 = 5.0 USD per million tokens, at 1.0 EUR/USD
        assert_eq!(body["cost"]["currency"], "EUR");
        assert_eq!(body["cost"]["total_cost"], 0.000005);
    }

    #[tokio::test]
    async fn chat_uses_requested_model() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/messages")
            .match_body(Matcher::PartialJson(json!({"model": "claude-3-opus-20240229"})))
            .with_status(200)
            .with_body(r#"{"content": [{"type": "text", "text": "hello"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let app = test_server(&test_config(&server));

        let response = app
            .post("/api/chat")
            .json(&json!({"message": "hi", "modelId": "claude-3-opus-20240229"}))
            .await;

        upstream.assert_async().await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["model_used"], "claude-3-opus-20240229");
        assert!(body.get("token_usage").is_none());
        assert!(body.get("cost").is_none());
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_before_upstream() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/messages")
            .expect(0)
            .create_async()
            .await;
        let app = test_server(&test_config(&server));

        let response = app
            .post("/chat")
            .json(&json!({"message": "hi", "model_id": "gpt-4"}))
            .await;

        upstream.assert_async().await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["type"], "invalid_request");
        assert!(body["error"]["message"].as_str().unwrap().contains("gpt-4"));
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_bad_gateway() {
        let mut server = mockito::Server::new_async().await;
        let _upstream = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body(r#"{"error": {"message": "invalid x-api-key"}}"#)
            .create_async()
            .await;
        let app = test_server(&test_config(&server));

        let response = app
            .post("/chat")
            .json(&json!({
                "message": "hi",
                "conversation_history": [{"role": "user", "content": "before"}]
            }))
            .await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["type"], "upstream_error");
        assert_eq!(body["error"]["upstream_status"], 401);
        assert!(body["error"]["message"].as_str().unwrap().contains("invalid x-api-key"));
    }

    #[tokio::test]
    async fn missing_message_is_bad_request() {
        let server = mockito::Server::new_async().await;
        let app = test_server(&test_config(&server));

        app.post("/chat")
            .json(&json!({"conversation_history": []}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.post("/chat")
            .json(&json!({"message": "   "}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_api_key_is_service_unavailable() {
        let server = mockito::Server::new_async().await;
        let mut config = test_config(&server);
        config.anthropic.api_key = None;
        let app = test_server(&config);

        let response = app.post("/chat").json(&json!({"message": "hi"})).await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn wildcard_cors_allows_any_origin() {
        let server = mockito::Server::new_async().await;
        let app = test_server(&test_config(&server));

        let response = app
            .get("/health")
            .add_header(
                HeaderName::from_static("origin"),
                HeaderValue::from_static("http://localhost:8080"),
            )
            .await;

        assert_eq!(
            response.header("access-control-allow-origin").to_str().unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn listed_cors_origin_is_echoed() {
        let server = mockito::Server::new_async().await;
        let mut config = test_config(&server);
        config.server.cors_origins = vec!["http://localhost:8080".to_string()];
        let app = test_server(&config);

        let response = app
            .get("/health")
            .add_header(
                HeaderName::from_static("origin"),
                HeaderValue::from_static("http://localhost:8080"),
            )
            .await;

        assert_eq!(
            response.header("access-control-allow-origin").to_str().unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn duplicate_model_ids_fail_state_construction() {
        let mut config = Config::default();
        let first = config.models[0].clone();
        config.models.push(first);

        assert!(AppState::from_config(&config).is_err());
    }
}
