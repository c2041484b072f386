//! Semantic validation of a loaded configuration.
//!
//! Parsing already rejects malformed files; this pass checks cross-field
//! constraints the types cannot express.

use std::fmt;

use crate::{
    error::{Error, Result},
    schema::{
        EmbeddingProviderKind, ExambankConfig, KNOWLEDGE_POINTS_COLLECTION, QUESTIONS_COLLECTION,
    },
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "vector.overlap"
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Collapse error diagnostics into a single [`Error::Invalid`].
    pub fn into_result(self) -> Result<()> {
        let errors: Vec<String> = self
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(ToString::to_string)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid(errors.join("; ")))
        }
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Check cross-field constraints of `config`.
#[must_use]
pub fn validate(config: &ExambankConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let vector = &config.vector;

    if vector.max_length == 0 {
        result.push(
            Severity::Error,
            "vector.max_length",
            "must be greater than zero",
        );
    }
    if vector.overlap >= vector.max_length {
        result.push(
            Severity::Error,
            "vector.overlap",
            format!(
                "overlap {} must be smaller than max_length {}",
                vector.overlap, vector.max_length
            ),
        );
    }
    if vector.over_fetch == 0 {
        result.push(
            Severity::Warning,
            "vector.over_fetch",
            "zero over-fetch can return fewer distinct records than requested",
        );
    }

    for required in [QUESTIONS_COLLECTION, KNOWLEDGE_POINTS_COLLECTION] {
        if !vector.collections.contains_key(required) {
            result.push(
                Severity::Warning,
                format!("vector.collections.{required}"),
                "collection is not declared; records of this kind cannot be indexed",
            );
        }
    }

    for (name, collection) in &vector.collections {
        if !collection.metadata_fields.iter().any(|f| f == "uuid") {
            result.push(
                Severity::Error,
                format!("vector.collections.{name}.metadata_fields"),
                "must include `uuid`, the only join key back to the relational store",
            );
        }
    }

    if let Some(embeddings) = &config.embeddings {
        if embeddings.dimensions == Some(0) {
            result.push(
                Severity::Error,
                "embeddings.dimensions",
                "must be greater than zero",
            );
        }
        if embeddings.provider == EmbeddingProviderKind::Hashing && embeddings.api_key.is_some() {
            result.push(
                Severity::Warning,
                "embeddings.api_key",
                "ignored by the hashing provider",
            );
        }
    }

    result
}

impl ExambankConfig {
    /// Validate and return the config, failing on any error diagnostic.
    /// Warnings are logged.
    pub fn validated(self) -> Result<Self> {
        let result = validate(&self);
        for d in result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
        {
            tracing::warn!(path = %d.path, "{}", d.message);
        }
        result.into_result()?;
        Ok(self)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::CollectionConfig};

    #[test]
    fn default_config_is_valid() {
        let result = validate(&ExambankConfig::default());
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        assert_eq!(result.count(Severity::Warning), 0);
    }

    #[test]
    fn overlap_must_be_below_max_length() {
        let mut cfg = ExambankConfig::default();
        cfg.vector.max_length = 10;
        cfg.vector.overlap = 10;
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "vector.overlap")
        );
        assert!(cfg.validated().is_err());
    }

    #[test]
    fn collections_must_carry_uuid() {
        let mut cfg = ExambankConfig::default();
        cfg.vector.collections.insert(
            "questions".into(),
            CollectionConfig {
                metadata_fields: vec!["document".into()],
            },
        );
        let err = cfg.validated().unwrap_err();
        assert!(err.to_string().contains("vector.collections.questions"));
    }

    #[test]
    fn missing_collection_is_only_a_warning() {
        let mut cfg = ExambankConfig::default();
        cfg.vector.collections.remove("knowledge_points");
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }
}
