//! Storage collaborator behind the vector index.

use std::{collections::BTreeMap, sync::Arc};

use {async_trait::async_trait, exambank_common::Attributes, serde::Serialize};

use crate::{embeddings::EmbeddingProvider, error::Result};

/// Conjunction of `metadata[key] == value` predicates. Empty matches all.
pub type MetadataFilter = BTreeMap<String, String>;

/// Filter selecting every chunk of one record.
pub fn uuid_filter(uuid: &str) -> MetadataFilter {
    MetadataFilter::from([("uuid".to_string(), uuid.to_string())])
}

/// A named partition of the index and the schema its chunks carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub metadata_fields: Vec<String>,
    /// Embedding model the collection was created with.
    pub embedding_model: String,
    pub dimensions: usize,
}

/// A chunk ready to be written, embedding included.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub id: String,
    pub document: String,
    pub metadata: Attributes,
    pub embedding: Vec<f32>,
}

/// A chunk as read back from the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredChunk {
    pub id: String,
    pub document: String,
    pub metadata: Attributes,
}

/// A similarity search result, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub id: String,
    pub document: String,
    pub metadata: Attributes,
    /// Cosine similarity to the query.
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection unless it exists. Returns `true` if created.
    async fn create_collection(&self, info: &CollectionInfo) -> Result<bool>;

    async fn collection(&self, name: &str) -> Result<Option<CollectionInfo>>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Insert or overwrite chunks by id.
    async fn upsert(&self, collection: &str, chunks: &[ChunkRecord]) -> Result<()>;

    /// Nearest chunks to `embedding` among those matching `filter`.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: &MetadataFilter,
        limit: usize,
    ) -> Result<Vec<Hit>>;

    async fn get(
        &self,
        collection: &str,
        filter: &MetadataFilter,
        limit: Option<usize>,
    ) -> Result<Vec<StoredChunk>>;

    /// Delete matching chunks, returning how many were removed.
    async fn delete(&self, collection: &str, filter: &MetadataFilter) -> Result<u64>;

    async fn count(&self, collection: &str) -> Result<u64>;

    /// Distinct values of one metadata key across a collection.
    async fn distinct_metadata(&self, collection: &str, key: &str) -> Result<Vec<String>>;

    /// Drop every collection and chunk.
    async fn reset(&self) -> Result<()>;

    /// Embedding used by handles that were not given one explicitly.
    fn default_embedder(&self) -> Arc<dyn EmbeddingProvider>;
}
