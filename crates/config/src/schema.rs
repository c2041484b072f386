//! Config schema types (relational store, vector index, embeddings, keyword
//! extraction, exam generation, logging).
use std::{collections::BTreeMap, fmt, path::PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Name of the collection holding question chunks.
pub const QUESTIONS_COLLECTION: &str = "questions";
/// Name of the collection holding knowledge point chunks.
pub const KNOWLEDGE_POINTS_COLLECTION: &str = "knowledge_points";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExambankConfig {
    pub database: DatabaseConfig,
    pub vector: VectorConfig,
    /// Embedding function bound to every collection. `None` leaves the
    /// vector store on its built-in default embedding.
    pub embeddings: Option<EmbeddingsConfig>,
    pub keywords: KeywordsConfig,
    pub exam: ExamConfig,
    pub logging: LoggingConfig,
}

/// Relational store (system of record).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:exambank.db?mode=rwc".into(),
            max_connections: 5,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// sqlx connection URL of the index database.
    pub url: String,
    /// Whether destructive `reset` is permitted.
    pub allow_reset: bool,
    /// Maximum chunk length in characters.
    pub max_length: usize,
    /// Characters shared by consecutive chunks. Must be below `max_length`.
    pub overlap: usize,
    /// Extra raw hits requested on top of `n_results` by uuid queries, to
    /// compensate for several chunks collapsing onto one record.
    pub over_fetch: usize,
    /// Declared collections and the metadata each chunk carries.
    pub collections: BTreeMap<String, CollectionConfig>,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:vector_index.db?mode=rwc".into(),
            allow_reset: false,
            max_length: 200,
            overlap: 20,
            over_fetch: 100,
            collections: default_collections(),
        }
    }
}

/// A single vector index collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub metadata_fields: Vec<String>,
}

fn default_collections() -> BTreeMap<String, CollectionConfig> {
    let fields = |names: &[&str]| CollectionConfig {
        metadata_fields: names.iter().map(|s| (*s).to_string()).collect(),
    };
    BTreeMap::from([
        (
            QUESTIONS_COLLECTION.to_string(),
            fields(&[
                "uuid",
                "document",
                "type",
                "subject",
                "question",
                "options",
                "answer",
                "difficulty",
                "source",
                "exam_point",
            ]),
        ),
        (
            KNOWLEDGE_POINTS_COLLECTION.to_string(),
            fields(&[
                "uuid",
                "document",
                "subject",
                "knowledge_point",
                "difficulty",
                "source",
                "exam_point",
            ]),
        ),
    ])
}

/// Embedding backend choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Openai,
    /// Local deterministic feature hashing; no network.
    Hashing,
}

/// Embedding function configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub provider: EmbeddingProviderKind,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
    pub base_url: Option<String>,
    /// API key, usually `"${OPENAI_API_KEY}"`.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
}

impl fmt::Debug for EmbeddingsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingsConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Language model used to compress a knowledge point into one search keyword.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordsConfig {
    pub model: String,
    pub base_url: String,
    /// API key, usually `"${OPENAI_API_KEY}"`.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com".into(),
            api_key: None,
        }
    }
}

impl fmt::Debug for KeywordsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordsConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// How a section's free-text knowledge point is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgePointStrategy {
    /// Similarity search over the questions collection.
    #[default]
    Vector,
    /// LLM keyword extraction, then a substring match on the question text.
    Keyword,
}

/// Exam generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamConfig {
    pub knowledge_point_strategy: KnowledgePointStrategy,
    /// Exam spec file used by `generate` when none is given on the command line.
    pub spec: Option<PathBuf>,
}

/// Log output settings. Command-line flags take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the rotating log file. `None` disables file logging.
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            dir: Some(PathBuf::from("logs")),
            json: false,
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
