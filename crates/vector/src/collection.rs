//! Collection handles.
//!
//! A handle pairs a stored collection with the embedding function used to
//! turn text into vectors. The store only remembers the model *name* a
//! collection was created with, never the function itself, so every freshly
//! opened handle starts on the store's default embedder until
//! [`Collection::with_embedder`] binds another one.

use std::{fmt, sync::Arc};

use tracing::warn;

use crate::{
    embeddings::EmbeddingProvider,
    error::{Error, Result},
    store::{ChunkRecord, CollectionInfo, Hit, MetadataFilter, StoredChunk, VectorStore},
};

/// What to search with.
#[derive(Debug, Clone, Copy)]
pub enum QueryInput<'a> {
    Text(&'a str),
    Embedding(&'a [f32]),
}

#[derive(Clone)]
pub struct Collection {
    info: CollectionInfo,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.info.name)
            .field("embedder", &self.embedder.model_name())
            .finish()
    }
}

impl Collection {
    /// Open an existing collection bound to the store's default embedder.
    pub async fn open(store: Arc<dyn VectorStore>, name: &str) -> Result<Self> {
        let info = store
            .collection(name)
            .await?
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        let embedder = store.default_embedder();
        Ok(Self {
            info,
            store,
            embedder,
        })
    }

    /// Bind `embedder` to this handle.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        if embedder.model_name() != self.info.embedding_model {
            warn!(
                collection = %self.info.name,
                created_with = %self.info.embedding_model,
                bound = %embedder.model_name(),
                "embedding model differs from the one the collection was created with"
            );
        }
        self.embedder = embedder;
        self
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &CollectionInfo {
        &self.info
    }

    /// Model of the currently bound embedding function.
    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }

    /// Embed and upsert `(id, document, metadata)` entries.
    pub async fn add(&self, entries: &[StoredChunk]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = entries.iter().map(|e| e.document.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| Error::embedding(&e))?;
        if embeddings.len() != entries.len() {
            return Err(Error::Embedding {
                message: format!(
                    "{} embeddings returned for {} documents",
                    embeddings.len(),
                    entries.len()
                ),
            });
        }

        let records: Vec<ChunkRecord> = entries
            .iter()
            .zip(embeddings)
            .map(|(entry, embedding)| ChunkRecord {
                id: entry.id.clone(),
                document: entry.document.clone(),
                metadata: entry.metadata.clone(),
                embedding,
            })
            .collect();
        self.store.upsert(&self.info.name, &records).await
    }

    pub async fn query(
        &self,
        input: QueryInput<'_>,
        filter: &MetadataFilter,
        n_results: usize,
    ) -> Result<Vec<Hit>> {
        let embedding = match input {
            QueryInput::Text(text) => self
                .embedder
                .embed(text)
                .await
                .map_err(|e| Error::embedding(&e))?,
            QueryInput::Embedding(v) => v.to_vec(),
        };
        self.store
            .query(&self.info.name, &embedding, filter, n_results)
            .await
    }

    pub async fn get(
        &self,
        filter: &MetadataFilter,
        limit: Option<usize>,
    ) -> Result<Vec<StoredChunk>> {
        self.store.get(&self.info.name, filter, limit).await
    }

    pub async fn delete(&self, filter: &MetadataFilter) -> Result<u64> {
        self.store.delete(&self.info.name, filter).await
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count(&self.info.name).await
    }

    pub(crate) async fn distinct(&self, key: &str) -> Result<Vec<String>> {
        self.store.distinct_metadata(&self.info.name, key).await
    }
}
