//! Question answering endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::RagOutput;
use crate::server::state::AppState;

/// Query string for `GET /rag/`
#[derive(Debug, Deserialize)]
pub struct RagParams {
    pub query: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
}

/// Body for `POST /api/query`
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub prompt_template: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub context: Vec<String>,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl QueryResponse {
    fn new(query: String, output: RagOutput) -> Self {
        Self {
            query,
            warning: output.retrieval.warning(),
            context: output.context,
            answer: output.answer,
        }
    }
}

/// GET /rag/ - Answer a question
pub async fn rag_query(
    State(state): State<AppState>,
    Query(params): Query<RagParams>,
) -> Result<Json<QueryResponse>> {
    let collection = state.collection_or_default(params.collection);
    answer(&state, params.query, &collection, params.template.as_deref()).await
}

/// POST /api/query - Answer a question with an optional custom template
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let collection = state.collection_or_default(request.collection);
    answer(&state, request.query, &collection, request.prompt_template.as_deref()).await
}

async fn answer(
    state: &AppState,
    query: String,
    collection: &str,
    template: Option<&str>,
) -> Result<Json<QueryResponse>> {
    tracing::info!("Query against '{}': {}", collection, query);
    let output = state.agent().generate_reply(&query, collection, template).await?;
    Ok(Json(QueryResponse::new(query, output)))
}
