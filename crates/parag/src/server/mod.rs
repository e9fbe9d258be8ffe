//! HTTP server for the RAG service

pub mod routes;
pub mod state;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new RAG server, building every provider from `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = build_router(self.state);

        tracing::info!("Starting RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let server = &state.config().server;
    let mut router = Router::new()
        .route("/health", get(health_check))
        .merge(routes::api_routes(server.max_upload_size))
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    if server.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (embedder, store, llm) = tokio::join!(
        state.embedder().health_check(),
        state.store().health_check(),
        state.llm().health_check(),
    );

    Json(json!({
        "status": "ok",
        "embedder": embedder.unwrap_or(false),
        "store": store.unwrap_or(false),
        "llm": llm.unwrap_or(false),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryCollectionStore;
    use crate::testing::{FakeEmbedder, FakeLlm};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const POLICY: &str = "Passwords are rotated every ninety days. \
        Remote access requires the corporate VPN.";

    async fn app() -> (Router, AppState) {
        let store = Arc::new(MemoryCollectionStore::new());
        let state = AppState::from_parts(
            RagConfig::default(),
            Arc::new(FakeEmbedder::default()),
            store,
            Arc::new(FakeLlm::answering("Every ninety days.")),
        );
        state
            .ingest()
            .ingest_text("Organization_1", "policy.pdf", POLICY)
            .await
            .unwrap();
        (build_router(state.clone()), state)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_rag_answers_from_default_collection() {
        let (router, state) = app().await;
        let (status, body) = send(&router, get("/rag/?query=how%20often%20are%20passwords%20rotated")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Every ninety days.");
        assert_eq!(body["context"].as_array().unwrap().len(), 1);
        assert!(body.get("warning").is_none());
        assert_eq!(state.dialogue().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let (router, state) = app().await;
        let (status, body) = send(&router, get("/rag/?query=q&collection=Organization_9")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "collection_not_found");
        assert!(state.dialogue().is_empty());
    }

    #[tokio::test]
    async fn test_post_query_with_empty_template_is_bad_request() {
        let (router, _) = app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"query":"q","prompt_template":""}"#))
            .unwrap();

        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_prompt");
    }

    #[tokio::test]
    async fn test_dialogue_lists_answered_queries() {
        let (router, _) = app().await;
        send(&router, get("/rag/?query=first")).await;
        send(&router, get("/rag/?query=second")).await;

        let (status, body) = send(&router, get("/dialogue/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["entries"][0]["query"], "first");
        assert_eq!(body["entries"][1]["query"], "second");
    }

    #[tokio::test]
    async fn test_search_returns_payload_fields() {
        let (router, _) = app().await;
        let (status, body) = send(&router, get("/search/?query=vpn")).await;

        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["filename"], "policy.pdf");
        assert!(results[0]["chunk_text"].as_str().unwrap().contains("VPN"));
    }

    #[tokio::test]
    async fn test_database_listing_and_clear() {
        let (router, _) = app().await;

        let (status, body) = send(&router, get("/database/files/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"][0]["filename"], "policy.pdf");
        assert_eq!(body["files"][0]["chunk_count"], 1);

        let (_, body) = send(&router, get("/database/all-docs/")).await;
        assert_eq!(body["total_documents"], 1);
        assert_eq!(body["files"][0]["id_range"], "0-0");

        let clear = Request::builder()
            .method(Method::DELETE)
            .uri("/database/clear/")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, clear).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&router, get("/database/info/")).await;
        assert_eq!(body["exists"], false);
        assert_eq!(body["total_documents_sampled"], 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (router, _) = app().await;
        let boundary = "parag-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nhello\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "unsupported_type");
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = app().await;
        let (status, body) = send(&router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["store"], true);
    }
}
