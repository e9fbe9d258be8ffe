//! Collection store provider trait for named vector collections

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Field holding the chunk text
pub const FIELD_CHUNK_TEXT: &str = "chunk_text";
/// Field holding the source filename
pub const FIELD_FILENAME: &str = "filename";
/// Field holding the ISO-8601 upload time
pub const FIELD_UPLOAD_TIMESTAMP: &str = "upload_timestamp";
/// Primary key field
pub const FIELD_ID: &str = "id";

/// Requested payload fields, keyed by name
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// One stored chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRow {
    pub id: u64,
    pub vector: Vec<f32>,
    pub chunk_text: String,
    pub filename: String,
    pub upload_timestamp: String,
}

impl ChunkRow {
    /// Project the scalar fields onto `fields`; unknown names are skipped
    pub fn project(&self, fields: &[&str]) -> Payload {
        let mut payload = Payload::new();
        for field in fields {
            let value = match *field {
                FIELD_ID => serde_json::Value::from(self.id),
                FIELD_CHUNK_TEXT => serde_json::Value::from(self.chunk_text.clone()),
                FIELD_FILENAME => serde_json::Value::from(self.filename.clone()),
                FIELD_UPLOAD_TIMESTAMP => serde_json::Value::from(self.upload_timestamp.clone()),
                _ => continue,
            };
            payload.insert((*field).to_string(), value);
        }
        payload
    }
}

/// Similarity search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Row id
    pub id: u64,
    /// Cosine similarity, higher is more similar
    pub score: f32,
    /// Requested fields; `None` when the backend returned no payload
    pub entity: Option<Payload>,
}

impl SearchHit {
    /// Non-empty `chunk_text` from the payload, if any
    pub fn chunk_text(&self) -> Option<&str> {
        self.entity
            .as_ref()?
            .get(FIELD_CHUNK_TEXT)?
            .as_str()
            .filter(|text| !text.is_empty())
    }
}

/// Row filter for non-similarity lookups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    /// Only rows from this file
    pub filename: Option<String>,
}

impl RowFilter {
    /// Match every row
    pub fn all() -> Self {
        Self::default()
    }

    /// Match rows of one file
    pub fn by_filename(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
        }
    }

    pub fn matches(&self, row: &ChunkRow) -> bool {
        self.filename.as_deref().map_or(true, |f| f == row.filename)
    }
}

/// Trait for a store of named vector collections
///
/// Operations on a collection that does not exist fail with
/// `CollectionNotFound`; transport failures surface as `StoreUnavailable`.
///
/// Implementations:
/// - `MemoryCollectionStore`: in-process exact search
/// - `QdrantCollectionStore`: Qdrant server
#[async_trait]
pub trait CollectionStoreProvider: Send + Sync {
    /// Check whether a collection exists
    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Names of all collections
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Create a collection for vectors of `dimension`; no-op if it exists
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()>;

    /// Drop a collection and all its rows
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Insert rows, returning how many were written
    async fn insert(&self, collection: &str, rows: Vec<ChunkRow>) -> Result<usize>;

    /// Top-`limit` rows by similarity to `vector`, best first
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        output_fields: &[&str],
    ) -> Result<Vec<SearchHit>>;

    /// Rows matching `filter`, each carrying its `id` plus `output_fields`
    async fn query(
        &self,
        collection: &str,
        filter: &RowFilter,
        output_fields: &[&str],
        limit: usize,
    ) -> Result<Vec<Payload>>;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ChunkRow {
        ChunkRow {
            id: 7,
            vector: vec![1.0, 0.0],
            chunk_text: "Passwords rotate every 90 days.".to_string(),
            filename: "policy.pdf".to_string(),
            upload_timestamp: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_project_requested_fields_only() {
        let payload = row().project(&[FIELD_FILENAME, FIELD_CHUNK_TEXT, "vector"]);
        assert_eq!(payload.len(), 2);
        assert_eq!(payload[FIELD_FILENAME], "policy.pdf");
        assert!(!payload.contains_key(FIELD_UPLOAD_TIMESTAMP));
    }

    #[test]
    fn test_hit_chunk_text() {
        let mut hit = SearchHit {
            id: 1,
            score: 0.9,
            entity: Some(row().project(&[FIELD_CHUNK_TEXT])),
        };
        assert_eq!(hit.chunk_text(), Some("Passwords rotate every 90 days."));

        hit.entity = Some(row().project(&[FIELD_FILENAME]));
        assert_eq!(hit.chunk_text(), None);

        hit.entity = None;
        assert_eq!(hit.chunk_text(), None);

        let mut empty = Payload::new();
        empty.insert(FIELD_CHUNK_TEXT.to_string(), serde_json::Value::from(""));
        hit.entity = Some(empty);
        assert_eq!(hit.chunk_text(), None);
    }

    #[test]
    fn test_filter() {
        assert!(RowFilter::all().matches(&row()));
        assert!(RowFilter::by_filename("policy.pdf").matches(&row()));
        assert!(!RowFilter::by_filename("other.pdf").matches(&row()));
    }
}
