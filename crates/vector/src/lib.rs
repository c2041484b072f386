//! Vector index: split documents into chunks, embed them under content ids
//! and answer similarity queries at record granularity.

pub mod chunker;
pub mod client;
pub mod collection;
pub mod config;
pub mod embeddings;
pub mod embeddings_openai;
pub mod error;
pub mod identity;
pub mod store;
pub mod store_sqlite;

pub use {
    chunker::{CharacterTextSplitter, TextSplitter, split},
    client::{CollectionSummary, VectorIndexClient},
    collection::{Collection, QueryInput},
    config::{KNOWLEDGE_POINTS, QUESTIONS, VectorIndexConfig},
    embeddings::{EmbeddingProvider, HashingEmbeddingProvider},
    embeddings_openai::OpenAiEmbeddingProvider,
    error::{Error, Result},
    identity::content_id,
    store::{CollectionInfo, Hit, MetadataFilter, StoredChunk, VectorStore, uuid_filter},
    store_sqlite::SqliteVectorStore,
};

/// Run database migrations for the vector index tables.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
