//! Qdrant collection store backend

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, Condition, CreateCollectionBuilder, Distance, Filter,
    PayloadIncludeSelector, PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;

use crate::config::StoreConfig;
use crate::error::{Error, Result};

use super::collection_store::{
    ChunkRow, CollectionStoreProvider, Payload, RowFilter, SearchHit, FIELD_CHUNK_TEXT,
    FIELD_FILENAME, FIELD_ID, FIELD_UPLOAD_TIMESTAMP,
};

const SCROLL_PAGE: u32 = 256;

/// Collection store backed by a Qdrant server
pub struct QdrantCollectionStore {
    client: Qdrant,
}

impl QdrantCollectionStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| Error::store_unavailable(e.to_string()))?;

        tracing::info!("Qdrant collection store at {}", config.url);
        Ok(Self { client })
    }
}

/// Classify a client error for `collection`
fn map_err(collection: &str, e: impl std::fmt::Display) -> Error {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("not found") || lower.contains("doesn't exist") {
        Error::CollectionNotFound(collection.to_string())
    } else if lower.contains("transport")
        || lower.contains("connect")
        || lower.contains("unavailable")
        || lower.contains("deadline")
    {
        Error::store_unavailable(msg)
    } else {
        Error::Store(msg)
    }
}

fn payload_selector(fields: &[&str]) -> SelectorOptions {
    let fields: Vec<String> = fields
        .iter()
        .filter(|f| **f != FIELD_ID)
        .map(|f| (*f).to_string())
        .collect();
    if fields.is_empty() {
        false.into()
    } else {
        PayloadIncludeSelector { fields }.into()
    }
}

fn point_id(id: Option<&PointId>) -> Option<u64> {
    match id?.point_id_options.as_ref()? {
        PointIdOptions::Num(num) => Some(*num),
        PointIdOptions::Uuid(_) => None,
    }
}

fn to_json(value: &QdrantValue) -> Option<serde_json::Value> {
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(serde_json::Value::from(s.clone())),
        Kind::IntegerValue(n) => Some(serde_json::Value::from(*n)),
        Kind::DoubleValue(d) => Some(serde_json::Value::from(*d)),
        Kind::BoolValue(b) => Some(serde_json::Value::from(*b)),
        Kind::NullValue(_) => Some(serde_json::Value::Null),
        _ => None,
    }
}

/// Convert a point's payload, adding `id` when it was requested
fn to_payload(
    id: Option<u64>,
    payload: &HashMap<String, QdrantValue>,
    fields: &[&str],
    always_id: bool,
) -> Payload {
    let mut out = Payload::new();
    for (key, value) in payload {
        if let Some(json) = to_json(value) {
            out.insert(key.clone(), json);
        }
    }
    if let Some(id) = id {
        if always_id || fields.contains(&FIELD_ID) {
            out.insert(FIELD_ID.to_string(), serde_json::Value::from(id));
        }
    }
    out
}

#[async_trait]
impl CollectionStoreProvider for QdrantCollectionStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| Error::store_unavailable(e.to_string()))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| Error::store_unavailable(e.to_string()))?;

        let mut names: Vec<String> = response.collections.into_iter().map(|c| c.name).collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        if self.has_collection(name).await? {
            return Ok(());
        }

        let create = CreateCollectionBuilder::new(name)
            .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine));

        self.client
            .create_collection(create)
            .await
            .map_err(|e| map_err(name, e))?;

        tracing::info!("Created collection '{}' ({} dims)", name, dimension);
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        if !self.has_collection(name).await? {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        self.client
            .delete_collection(name)
            .await
            .map_err(|e| map_err(name, e))?;
        Ok(())
    }

    async fn insert(&self, collection: &str, rows: Vec<ChunkRow>) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let count = rows.len();
        let points: Vec<PointStruct> = rows
            .into_iter()
            .map(|row| {
                let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                payload.insert(FIELD_CHUNK_TEXT.to_string(), row.chunk_text.into());
                payload.insert(FIELD_FILENAME.to_string(), row.filename.into());
                payload.insert(FIELD_UPLOAD_TIMESTAMP.to_string(), row.upload_timestamp.into());
                PointStruct::new(row.id, row.vector, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| map_err(collection, e))?;

        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        output_fields: &[&str],
    ) -> Result<Vec<SearchHit>> {
        let request = SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
            .with_payload(payload_selector(output_fields));

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| map_err(collection, e))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point_id(point.id.as_ref())?;
                let entity = (!point.payload.is_empty())
                    .then(|| to_payload(Some(id), &point.payload, output_fields, false));
                Some(SearchHit {
                    id,
                    score: point.score,
                    entity,
                })
            })
            .collect())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &RowFilter,
        output_fields: &[&str],
        limit: usize,
    ) -> Result<Vec<Payload>> {
        let mut rows = Vec::new();
        let mut offset: Option<PointId> = None;

        while rows.len() < limit {
            let page = SCROLL_PAGE.min((limit - rows.len()) as u32);
            let mut request = ScrollPointsBuilder::new(collection)
                .limit(page)
                .with_payload(payload_selector(output_fields))
                .with_vectors(false);

            if let Some(ref filename) = filter.filename {
                request = request.filter(Filter::must([Condition::matches(
                    FIELD_FILENAME,
                    filename.clone(),
                )]));
            }
            if let Some(off) = offset.take() {
                request = request.offset(off);
            }

            let response = self
                .client
                .scroll(request)
                .await
                .map_err(|e| map_err(collection, e))?;

            if response.result.is_empty() {
                break;
            }

            rows.extend(response.result.iter().map(|point| {
                to_payload(point_id(point.id.as_ref()), &point.payload, output_fields, true)
            }));

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        rows.truncate(limit);
        Ok(rows)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.client.health_check().await.is_ok())
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_selector() {
        match payload_selector(&[FIELD_ID, FIELD_FILENAME, FIELD_CHUNK_TEXT]) {
            SelectorOptions::Include(include) => {
                assert_eq!(include.fields, vec![FIELD_FILENAME, FIELD_CHUNK_TEXT]);
            }
            other => panic!("unexpected selector: {:?}", other),
        }
        assert_eq!(payload_selector(&[FIELD_ID]), SelectorOptions::Enable(false));
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(
            map_err("org", "Collection `org` doesn't exist!"),
            Error::CollectionNotFound(_)
        ));
        assert!(matches!(
            map_err("org", "status: Unavailable, message: \"error trying to connect\""),
            Error::StoreUnavailable(_)
        ));
        assert!(matches!(map_err("org", "Wrong input: vector dimension error"), Error::Store(_)));
    }

    #[test]
    fn test_payload_conversion() {
        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert(FIELD_FILENAME.to_string(), "policy.pdf".to_string().into());

        let converted = to_payload(Some(4), &payload, &[FIELD_FILENAME], false);
        assert_eq!(converted[FIELD_FILENAME], "policy.pdf");
        assert!(!converted.contains_key(FIELD_ID));

        let with_id = to_payload(Some(4), &payload, &[], true);
        assert_eq!(with_id[FIELD_ID], 4);
    }

    #[test]
    fn test_numeric_point_id() {
        let id: PointId = 12u64.into();
        assert_eq!(point_id(Some(&id)), Some(12));
        assert_eq!(point_id(None), None);
    }
}
