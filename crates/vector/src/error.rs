use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Chunk stride would be zero or negative.
    #[error("invalid chunking: overlap {overlap} must be smaller than max_length {max_length}")]
    InvalidChunking { max_length: usize, overlap: usize },

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("unsupported collection: {0}")]
    UnsupportedCollection(String),

    #[error("record for '{collection}' is missing attribute `{field}`")]
    MissingAttribute {
        collection: String,
        field: &'static str,
    },

    #[error("invalid metadata key: {0:?}")]
    InvalidMetadataKey(String),

    #[error("reset is disabled for this index")]
    ResetDisabled,

    #[error("embedding failed: {message}")]
    Embedding { message: String },
}

impl Error {
    #[must_use]
    pub fn embedding(source: &anyhow::Error) -> Self {
        Self::Embedding {
            message: format!("{source:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
