//! Configuration loading, env substitution, and validation.
//!
//! Config files: `exambank.toml`, `exambank.yaml`, or `exambank.json`,
//! searched in `./` then the user config directory.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_config, load_config, load_or_discover},
    schema::{
        CollectionConfig, DatabaseConfig, EmbeddingProviderKind, EmbeddingsConfig, ExamConfig,
        ExambankConfig, KNOWLEDGE_POINTS_COLLECTION, KeywordsConfig, KnowledgePointStrategy,
        LoggingConfig, QUESTIONS_COLLECTION, VectorConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
