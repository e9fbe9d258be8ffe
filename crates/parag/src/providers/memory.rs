//! In-process collection store
//!
//! Exact cosine search over every row of a collection. Nothing is persisted.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

use super::collection_store::{
    ChunkRow, CollectionStoreProvider, Payload, RowFilter, SearchHit, FIELD_ID,
};

struct MemoryCollection {
    dimension: usize,
    rows: BTreeMap<u64, ChunkRow>,
}

/// Collection store held entirely in memory
#[derive(Default)]
pub struct MemoryCollectionStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryCollectionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in a collection
    pub fn row_count(&self, collection: &str) -> Result<usize> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.rows.len())
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))
    }
}

/// Cosine similarity between two vectors; 0.0 if either is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl CollectionStoreProvider for MemoryCollectionStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Err(Error::Store("collection dimension must be positive".to_string()));
        }
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| MemoryCollection {
                dimension,
                rows: BTreeMap::new(),
            });
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    async fn insert(&self, collection: &str, rows: Vec<ChunkRow>) -> Result<usize> {
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;

        if let Some(bad) = rows.iter().find(|r| r.vector.len() != target.dimension) {
            return Err(Error::Store(format!(
                "row {} has dimension {}, collection '{}' expects {}",
                bad.id,
                bad.vector.len(),
                collection,
                target.dimension
            )));
        }

        let count = rows.len();
        for row in rows {
            target.rows.insert(row.id, row);
        }
        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        output_fields: &[&str],
    ) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;

        if vector.len() != target.dimension {
            return Err(Error::Store(format!(
                "query has dimension {}, collection '{}' expects {}",
                vector.len(),
                collection,
                target.dimension
            )));
        }

        let mut scored: Vec<(f32, &ChunkRow)> = target
            .rows
            .values()
            .map(|row| (cosine_similarity(vector, &row.vector), row))
            .collect();

        // rows iterate in id order and the sort is stable, so ties keep id order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(score, row)| SearchHit {
                id: row.id,
                score,
                entity: Some(row.project(output_fields)),
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
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;

        Ok(target
            .rows
            .values()
            .filter(|row| filter.matches(row))
            .take(limit)
            .map(|row| {
                let mut payload = row.project(output_fields);
                payload.insert(FIELD_ID.to_string(), serde_json::Value::from(row.id));
                payload
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
