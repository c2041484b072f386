//! SQLite implementation of the `VectorStore` trait.
//!
//! Embeddings are stored as little-endian f32 blobs and ranked in-process by
//! cosine similarity; metadata filters run in SQL through `json_extract`.
use std::{cmp::Ordering, sync::Arc};

use {
    async_trait::async_trait,
    exambank_common::Attributes,
    sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqlitePoolOptions},
    tracing::{debug, info},
};

use crate::{
    embeddings::{EmbeddingProvider, HashingEmbeddingProvider, cosine_similarity},
    error::{Error, Result},
    store::{ChunkRecord, CollectionInfo, Hit, MetadataFilter, StoredChunk, VectorStore},
};

pub struct SqliteVectorStore {
    pool: SqlitePool,
    default_embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteVectorStore {
    /// Use an existing pool (call [`crate::run_migrations`] first).
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            default_embedder: Arc::new(HashingEmbeddingProvider::default()),
        }
    }

    /// Open a dedicated pool and run migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        crate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Deserialize a BLOB of little-endian f32s.
fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Serialize a slice of f32s to a BLOB of little-endian bytes.
fn vec_to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidMetadataKey(key.to_string()));
    }
    Ok(())
}

/// Append `AND json_extract(metadata, '$.key') = ?` per filter entry.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &MetadataFilter) -> Result<()> {
    for (key, value) in filter {
        validate_key(key)?;
        qb.push(format!(" AND json_extract(metadata, '$.{key}') = "))
            .push_bind(value.clone());
    }
    Ok(())
}

fn collection_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<CollectionInfo> {
    let fields: String = row.try_get("metadata_fields")?;
    Ok(CollectionInfo {
        name: row.try_get("name")?,
        metadata_fields: serde_json::from_str(&fields)?,
        embedding_model: row.try_get("embedding_model")?,
        dimensions: row.try_get::<i64, _>("dimensions")? as usize,
    })
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn create_collection(&self, info: &CollectionInfo) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO vector_collections (name, metadata_fields, embedding_model, dimensions)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(&info.name)
        .bind(serde_json::to_string(&info.metadata_fields)?)
        .bind(&info.embedding_model)
        .bind(info.dimensions as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let row = sqlx::query(
            "SELECT name, metadata_fields, embedding_model, dimensions
             FROM vector_collections WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(collection_from_row).transpose()
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let rows = sqlx::query(
            "SELECT name, metadata_fields, embedding_model, dimensions
             FROM vector_collections ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(collection_from_row).collect()
    }

    async fn upsert(&self, collection: &str, chunks: &[ChunkRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            sqlx::query(
                "INSERT INTO vector_chunks (collection, id, document, metadata, embedding)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(collection, id) DO UPDATE SET
                   document=excluded.document, metadata=excluded.metadata,
                   embedding=excluded.embedding, updated_at=datetime('now')",
            )
            .bind(collection)
            .bind(&chunk.id)
            .bind(&chunk.document)
            .bind(serde_json::to_string(&chunk.metadata)?)
            .bind(vec_to_blob(&chunk.embedding))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(collection, count = chunks.len(), "upserted chunks");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: &MetadataFilter,
        limit: usize,
    ) -> Result<Vec<Hit>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, document, metadata, embedding FROM vector_chunks WHERE collection = ",
        );
        qb.push_bind(collection.to_string());
        push_filter(&mut qb, filter)?;
        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata: String = row.try_get("metadata")?;
            let blob: Vec<u8> = row.try_get("embedding")?;
            hits.push(Hit {
                id: row.try_get("id")?,
                document: row.try_get("document")?,
                metadata: serde_json::from_str(&metadata)?,
                score: cosine_similarity(embedding, &blob_to_vec(&blob)),
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get(
        &self,
        collection: &str,
        filter: &MetadataFilter,
        limit: Option<usize>,
    ) -> Result<Vec<StoredChunk>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, document, metadata FROM vector_chunks WHERE collection = ",
        );
        qb.push_bind(collection.to_string());
        push_filter(&mut qb, filter)?;
        qb.push(" ORDER BY rowid");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }
        let rows = qb.build().fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<StoredChunk> {
                let metadata: String = row.try_get("metadata")?;
                Ok(StoredChunk {
                    id: row.try_get("id")?,
                    document: row.try_get("document")?,
                    metadata: serde_json::from_str::<Attributes>(&metadata)?,
                })
            })
            .collect()
    }

    async fn delete(&self, collection: &str, filter: &MetadataFilter) -> Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM vector_chunks WHERE collection = ");
        qb.push_bind(collection.to_string());
        push_filter(&mut qb, filter)?;
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vector_chunks WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    async fn distinct_metadata(&self, collection: &str, key: &str) -> Result<Vec<String>> {
        validate_key(key)?;
        let values: Vec<Option<String>> = sqlx::query_scalar(&format!(
            "SELECT DISTINCT json_extract(metadata, '$.{key}') FROM vector_chunks
             WHERE collection = ?"
        ))
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;
        Ok(values.into_iter().flatten().collect())
    }

    async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM vector_chunks")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM vector_collections")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("vector index reset");
        Ok(())
    }

    fn default_embedder(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.default_embedder)
    }
}
