//! Document upload endpoint

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::ingestion::IngestReport;
use crate::server::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CollectionParam {
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: IngestReport,
}

/// POST /upload/ - Ingest one PDF from the `file` multipart field
pub async fn upload_pdf(
    State(state): State<AppState>,
    Query(params): Query<CollectionParam>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let start = Instant::now();
    let collection = state.collection_or_default(params.collection);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Internal(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::UnsupportedFileType("upload has no filename".to_string()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Internal(format!("Failed to read file: {}", e)))?;

        tracing::info!("Processing file: {} ({} bytes)", filename, data.len());

        let report = state.ingest().ingest(&collection, &filename, data.to_vec()).await?;

        tracing::info!(
            "Ingested {} in {:.1}s",
            filename,
            start.elapsed().as_secs_f64()
        );

        let message = if report.search_ready {
            format!("{} processed and stored successfully. RAG is ready!", filename)
        } else {
            format!("{} stored, but the search check did not return results", filename)
        };

        return Ok(Json(UploadResponse { message, report }));
    }

    Err(Error::InvalidQuery("multipart field 'file' is required".to_string()))
}
