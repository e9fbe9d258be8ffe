//! Collection inspection and maintenance endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::providers::collection_store::{
    FIELD_CHUNK_TEXT, FIELD_FILENAME, FIELD_ID, FIELD_UPLOAD_TIMESTAMP,
};
use crate::providers::{Payload, RowFilter};
use crate::server::state::AppState;

use super::upload::CollectionParam;

const SAMPLE_ROWS: usize = 5;
const LISTING_ROWS: usize = 1000;
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Serialize)]
pub struct DatabaseInfo {
    pub collections: Vec<String>,
    pub collection_name: String,
    pub exists: bool,
    pub total_documents_sampled: usize,
    pub sample_documents: Vec<Payload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkPreview {
    pub id: Option<u64>,
    pub text_preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDetail {
    pub filename: String,
    pub upload_timestamp: String,
    pub chunks: Vec<ChunkPreview>,
    pub chunk_count: usize,
    pub id_range: String,
}

#[derive(Debug, Serialize)]
pub struct AllDocuments {
    pub total_documents: usize,
    pub files: Vec<FileDetail>,
    pub all_document_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub filename: String,
    pub upload_timestamp: String,
    pub chunk_count: usize,
}

#[derive(Debug, Serialize)]
pub struct FileList {
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

fn str_field<'a>(row: &'a Payload, field: &str, fallback: &'a str) -> &'a str {
    row.get(field).and_then(|v| v.as_str()).unwrap_or(fallback)
}

fn id_field(row: &Payload) -> Option<u64> {
    row.get(FIELD_ID).and_then(|v| v.as_u64())
}

/// First `PREVIEW_CHARS` characters followed by "...", or "No text"
fn preview(text: &str) -> String {
    if text.is_empty() {
        return "No text".to_string();
    }
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

/// Group rows by filename in first-seen order
pub fn group_files(rows: &[Payload]) -> Vec<FileDetail> {
    let mut files: Vec<FileDetail> = Vec::new();
    let mut ranges: Vec<Option<(u64, u64)>> = Vec::new();

    for row in rows {
        let filename = str_field(row, FIELD_FILENAME, "unknown_file");
        let index = match files.iter().position(|f| f.filename == filename) {
            Some(index) => index,
            None => {
                files.push(FileDetail {
                    filename: filename.to_string(),
                    upload_timestamp: str_field(row, FIELD_UPLOAD_TIMESTAMP, "unknown").to_string(),
                    chunks: Vec::new(),
                    chunk_count: 0,
                    id_range: String::new(),
                });
                ranges.push(None);
                files.len() - 1
            }
        };

        let id = id_field(row);
        let file = &mut files[index];
        file.chunks.push(ChunkPreview {
            id,
            text_preview: preview(str_field(row, FIELD_CHUNK_TEXT, "")),
        });
        file.chunk_count += 1;

        if let Some(id) = id {
            ranges[index] = Some(match ranges[index] {
                Some((min, max)) => (min.min(id), max.max(id)),
                None => (id, id),
            });
        }
    }

    for (file, range) in files.iter_mut().zip(ranges) {
        file.id_range = match range {
            Some((min, max)) => format!("{}-{}", min, max),
            None => "unknown".to_string(),
        };
    }

    files
}

/// Unique filenames with their first timestamp and chunk count
pub fn summarize_files(rows: &[Payload]) -> Vec<FileSummary> {
    let mut files: Vec<FileSummary> = Vec::new();
    for row in rows {
        let filename = str_field(row, FIELD_FILENAME, "unknown");
        match files.iter_mut().find(|f| f.filename == filename) {
            Some(file) => file.chunk_count += 1,
            None => files.push(FileSummary {
                filename: filename.to_string(),
                upload_timestamp: str_field(row, FIELD_UPLOAD_TIMESTAMP, "unknown").to_string(),
                chunk_count: 1,
            }),
        }
    }
    files
}

async fn require_collection(state: &AppState, collection: &str) -> Result<()> {
    if state.store().has_collection(collection).await? {
        Ok(())
    } else {
        Err(Error::CollectionNotFound(collection.to_string()))
    }
}

/// GET /database/info/ - Collections and a few sample rows
pub async fn database_info(
    State(state): State<AppState>,
    Query(params): Query<CollectionParam>,
) -> Result<Json<DatabaseInfo>> {
    let collection = state.collection_or_default(params.collection);
    let collections = state.store().list_collections().await?;
    let exists = collections.contains(&collection);

    let sample_documents = if exists {
        state
            .store()
            .query(&collection, &RowFilter::all(), &[FIELD_CHUNK_TEXT], SAMPLE_ROWS)
            .await?
    } else {
        Vec::new()
    };

    Ok(Json(DatabaseInfo {
        collections,
        collection_name: collection,
        exists,
        total_documents_sampled: sample_documents.len(),
        sample_documents,
    }))
}

/// GET /database/all-docs/ - Rows grouped by source file
pub async fn all_documents(
    State(state): State<AppState>,
    Query(params): Query<CollectionParam>,
) -> Result<Json<AllDocuments>> {
    let collection = state.collection_or_default(params.collection);
    require_collection(&state, &collection).await?;

    let rows = state
        .store()
        .query(
            &collection,
            &RowFilter::all(),
            &[FIELD_ID, FIELD_CHUNK_TEXT, FIELD_FILENAME, FIELD_UPLOAD_TIMESTAMP],
            LISTING_ROWS,
        )
        .await?;

    tracing::debug!("Total documents found in '{}': {}", collection, rows.len());

    let mut all_document_ids: Vec<u64> = rows.iter().filter_map(id_field).collect();
    all_document_ids.sort_unstable();

    Ok(Json(AllDocuments {
        total_documents: rows.len(),
        files: group_files(&rows),
        all_document_ids,
    }))
}

/// GET /database/files/ - Uploaded files
pub async fn list_files(
    State(state): State<AppState>,
    Query(params): Query<CollectionParam>,
) -> Result<Json<FileList>> {
    let collection = state.collection_or_default(params.collection);
    require_collection(&state, &collection).await?;

    let rows = state
        .store()
        .query(
            &collection,
            &RowFilter::all(),
            &[FIELD_FILENAME, FIELD_UPLOAD_TIMESTAMP],
            LISTING_ROWS,
        )
        .await?;

    Ok(Json(FileList {
        files: summarize_files(&rows),
    }))
}

/// DELETE /database/clear/ - Drop the collection and all its rows
pub async fn clear_database(
    State(state): State<AppState>,
    Query(params): Query<CollectionParam>,
) -> Result<Json<ClearResponse>> {
    let collection = state.collection_or_default(params.collection);
    state.store().drop_collection(&collection).await?;
    tracing::info!("Dropped collection '{}'", collection);

    Ok(Json(ClearResponse {
        message: format!("Collection {} cleared successfully", collection),
    }))
}
