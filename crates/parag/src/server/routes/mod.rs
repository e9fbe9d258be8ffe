//! HTTP routes for the RAG server

pub mod database;
pub mod dialogue;
pub mod rag;
pub mod search;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        // Ingestion, with a larger body limit for file uploads
        .route(
            "/upload/",
            post(upload::upload_pdf).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/search/", get(search::search))
        .route("/rag/", get(rag::rag_query))
        .route("/api/query", post(rag::query_rag))
        .route("/api/info", get(info))
        .route("/dialogue/", get(dialogue::list_dialogue))
        .route("/database/info/", get(database::database_info))
        .route("/database/all-docs/", get(database::all_documents))
        .route("/database/files/", get(database::list_files))
        .route("/database/clear/", delete(database::clear_database))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the RAG-powered PDF search API!"
    }))
}

/// API info endpoint
async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "parag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Policy-document RAG service with collection-scoped retrieval",
        "endpoints": {
            "POST /upload/": "Upload a PDF into a collection",
            "GET /search/": "Top-k chunk search",
            "GET /rag/": "Answer a question",
            "POST /api/query": "Answer a question with an optional prompt template",
            "GET /dialogue/": "Answered queries in call order",
            "GET /database/info/": "Collections and sample rows",
            "GET /database/all-docs/": "Rows grouped by file",
            "GET /database/files/": "Uploaded files",
            "DELETE /database/clear/": "Drop a collection"
        }
    }))
}
