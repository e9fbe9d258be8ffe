//! Raw similarity search endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::providers::Payload;
use crate::retrieval::RETRIEVAL_FIELDS;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub id: u64,
    pub score: f32,
    #[serde(flatten)]
    pub entity: Payload,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

/// GET /search/ - Top-k chunks for a query, without generation
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    if params.query.trim().is_empty() {
        return Err(Error::InvalidQuery("query must not be empty".to_string()));
    }

    let collection = state.collection_or_default(params.collection);
    if !state.store().has_collection(&collection).await? {
        return Err(Error::CollectionNotFound(collection));
    }

    let vector = state.embedder().embed_one(&params.query).await?;
    let hits = state
        .store()
        .search(&collection, &vector, state.retrieval().top_k(), &RETRIEVAL_FIELDS)
        .await?;

    let results = hits
        .into_iter()
        .map(|hit| SearchResult {
            id: hit.id,
            score: hit.score,
            entity: hit.entity.unwrap_or_default(),
        })
        .collect();

    Ok(Json(SearchResponse {
        query: params.query,
        results,
    }))
}
