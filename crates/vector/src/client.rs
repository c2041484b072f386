//! The vector index client: chunk, embed, upsert, query and delete records.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use {
    exambank_common::Attributes,
    serde::Serialize,
    tracing::{debug, error, info},
};

use crate::{
    chunker::{CharacterTextSplitter, TextSplitter},
    collection::{Collection, QueryInput},
    config::{KNOWLEDGE_POINTS, QUESTIONS, VectorIndexConfig},
    embeddings::EmbeddingProvider,
    error::{Error, Result},
    identity::content_id,
    store::{CollectionInfo, MetadataFilter, StoredChunk, VectorStore, uuid_filter},
};

/// Summary of a collection for display.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub collection_name: String,
    pub embedding_model: String,
    pub total_count: u64,
    pub displayed_count: usize,
    pub documents: Vec<StoredChunk>,
}

pub struct VectorIndexClient {
    store: Arc<dyn VectorStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    splitter: Arc<dyn TextSplitter>,
    config: VectorIndexConfig,
}

impl VectorIndexClient {
    /// Fails if the chunking parameters would not advance.
    pub fn new(store: Arc<dyn VectorStore>, config: VectorIndexConfig) -> Result<Self> {
        let splitter = CharacterTextSplitter::new(config.max_length, config.overlap)?;
        Ok(Self {
            store,
            embedder: None,
            splitter: Arc::new(splitter),
            config,
        })
    }

    /// Embedding function applied to every collection handle. Without one the
    /// store's default embedding is used.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn with_splitter(mut self, splitter: Arc<dyn TextSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn config(&self) -> &VectorIndexConfig {
        &self.config
    }

    fn active_embedder(&self) -> Arc<dyn EmbeddingProvider> {
        self.embedder
            .clone()
            .unwrap_or_else(|| self.store.default_embedder())
    }

    /// Create every declared collection that does not exist yet.
    pub async fn ensure_collections(&self) -> Result<()> {
        let embedder = self.active_embedder();
        for (name, fields) in &self.config.collections {
            let info = CollectionInfo {
                name: name.clone(),
                metadata_fields: fields.clone(),
                embedding_model: embedder.model_name().to_string(),
                dimensions: embedder.dimensions(),
            };
            if self.store.create_collection(&info).await? {
                info!(
                    collection = %name,
                    embedding_model = %info.embedding_model,
                    "created collection"
                );
            } else {
                debug!(collection = %name, "collection already exists");
            }
        }
        Ok(())
    }

    /// Open `name` with the configured embedding function bound.
    ///
    /// The binding is redone on every call: a freshly opened handle always
    /// starts on the store's default embedding.
    pub async fn get_collection(&self, name: &str) -> Result<Collection> {
        let collection = Collection::open(Arc::clone(&self.store), name).await?;
        Ok(match &self.embedder {
            Some(embedder) => {
                debug!(collection = %name, model = %embedder.model_name(), "re-binding embedding function");
                collection.with_embedder(Arc::clone(embedder))
            },
            None => collection,
        })
    }

    /// Chunk `text` and upsert every chunk under its content id, each carrying
    /// the full `metadata`. Returns the number of chunks written.
    pub async fn add_document(
        &self,
        collection_name: &str,
        text: &str,
        metadata: &Attributes,
    ) -> Result<usize> {
        let collection = self.get_collection(collection_name).await?;

        let mut metadata = metadata.clone();
        for field in &collection.info().metadata_fields {
            metadata.entry(field.clone()).or_default();
        }

        let entries: Vec<StoredChunk> = self
            .splitter
            .split(text)
            .into_iter()
            .map(|chunk| StoredChunk {
                id: content_id(&chunk),
                document: chunk,
                metadata: metadata.clone(),
            })
            .collect();
        collection.add(&entries).await.inspect_err(|e| {
            error!(collection = %collection_name, error = %e, "failed to add document");
        })?;
        debug!(collection = %collection_name, chunks = entries.len(), "indexed document");
        Ok(entries.len())
    }

    /// Index the stem, the answer and, when present, the options of a
    /// question as separate documents sharing `data` as metadata.
    pub async fn add_question(&self, data: &Attributes) -> Result<()> {
        let question = required(data, QUESTIONS, "question")?;
        let answer = required(data, QUESTIONS, "answer")?;
        self.add_document(QUESTIONS, question, data).await?;
        self.add_document(QUESTIONS, answer, data).await?;
        if let Some(options) = data.get("options").filter(|o| !o.is_empty()) {
            self.add_document(QUESTIONS, options, data).await?;
        }
        Ok(())
    }

    pub async fn add_knowledge_point(&self, data: &Attributes) -> Result<()> {
        let document = required(data, KNOWLEDGE_POINTS, "document")?;
        self.add_document(KNOWLEDGE_POINTS, document, data).await?;
        Ok(())
    }

    /// Distinct record uuids of the best-matching chunks, best first.
    ///
    /// Requests `n_results + over_fetch` raw hits so that chunks collapsing
    /// onto one record rarely leave the answer short. The result holds at
    /// most `n_results` uuids, possibly fewer.
    pub async fn query_by_uuid(
        &self,
        collection_name: &str,
        input: QueryInput<'_>,
        filter: &MetadataFilter,
        n_results: usize,
    ) -> Result<Vec<String>> {
        if n_results == 0 {
            return Ok(Vec::new());
        }
        let collection = self.get_collection(collection_name).await?;
        let raw = n_results.saturating_add(self.config.over_fetch);
        let hits = collection.query(input, filter, raw).await?;

        let mut seen = HashSet::new();
        let mut uuids: Vec<String> = hits
            .into_iter()
            .filter_map(|hit| hit.metadata.get("uuid").cloned())
            .filter(|uuid| seen.insert(uuid.clone()))
            .collect();
        uuids.truncate(n_results);
        debug!(collection = %collection_name, requested = n_results, raw, found = uuids.len(), "query by uuid");
        Ok(uuids)
    }

    /// Replace every chunk of `uuid` by re-indexing `metadata`.
    ///
    /// Delete then add: if the add fails the record is absent from the index
    /// until the next successful write or resync.
    pub async fn update_document(
        &self,
        collection_name: &str,
        uuid: &str,
        metadata: &Attributes,
    ) -> Result<()> {
        if collection_name != QUESTIONS && collection_name != KNOWLEDGE_POINTS {
            return Err(Error::UnsupportedCollection(collection_name.to_string()));
        }
        self.delete_document(collection_name, uuid).await?;
        let added = if collection_name == QUESTIONS {
            self.add_question(metadata).await
        } else {
            self.add_knowledge_point(metadata).await
        };
        added.inspect_err(|e| {
            error!(collection = %collection_name, uuid, error = %e, "re-add after delete failed");
        })
    }

    /// Remove every chunk whose metadata uuid is `uuid`. Returns the count.
    pub async fn delete_document(&self, collection_name: &str, uuid: &str) -> Result<u64> {
        let collection = self.get_collection(collection_name).await?;
        let removed = collection
            .delete(&uuid_filter(uuid))
            .await
            .inspect_err(|e| {
                error!(collection = %collection_name, uuid, error = %e, "failed to delete document");
            })?;
        debug!(collection = %collection_name, uuid, removed, "deleted document");
        Ok(removed)
    }

    /// Destroy all vectors and recreate the declared collections empty.
    pub async fn reset_all(&self) -> Result<()> {
        if !self.config.allow_reset {
            return Err(Error::ResetDisabled);
        }
        self.store.reset().await?;
        self.ensure_collections().await
    }

    /// Chunks stored for each of `uuids`.
    pub async fn documents_for_uuids(
        &self,
        collection_name: &str,
        uuids: &[String],
    ) -> Result<BTreeMap<String, Vec<StoredChunk>>> {
        let collection = self.get_collection(collection_name).await?;
        let mut out = BTreeMap::new();
        for uuid in uuids {
            out.insert(uuid.clone(), collection.get(&uuid_filter(uuid), None).await?);
        }
        Ok(out)
    }

    /// Total chunk count plus the first `limit` chunks.
    pub async fn describe_collection(&self, name: &str, limit: usize) -> Result<CollectionSummary> {
        let collection = self.get_collection(name).await?;
        let total_count = collection.count().await?;
        let documents = collection
            .get(&MetadataFilter::new(), Some(limit))
            .await?;
        Ok(CollectionSummary {
            collection_name: name.to_string(),
            embedding_model: collection.info().embedding_model.clone(),
            total_count,
            displayed_count: documents.len(),
            documents,
        })
    }

    pub async fn collections(&self) -> Result<Vec<CollectionInfo>> {
        self.store.list_collections().await
    }

    /// Every record uuid referenced by at least one chunk of the collection.
    pub async fn uuids_in(&self, collection_name: &str) -> Result<HashSet<String>> {
        let collection = self.get_collection(collection_name).await?;
        Ok(collection.distinct("uuid").await?.into_iter().collect())
    }
}

fn required<'a>(data: &'a Attributes, collection: &str, field: &'static str) -> Result<&'a str> {
    data.get(field)
        .map(String::as_str)
        .ok_or_else(|| Error::MissingAttribute {
            collection: collection.to_string(),
            field,
        })
}
