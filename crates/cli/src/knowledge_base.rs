//! Wires the relational store, the vector index and the sync hook together
//! from an [`ExambankConfig`].

use std::sync::Arc;

use {
    anyhow::Context,
    exambank_config::{
        EmbeddingProviderKind, EmbeddingsConfig, ExambankConfig, KeywordsConfig,
        KnowledgePointStrategy, VectorConfig,
    },
    exambank_exam::{KeywordExtractor, OpenAiKeywordExtractor, QuestionFinder, TestGenerator},
    exambank_records::SqliteRecordStore,
    exambank_sync::SyncManager,
    exambank_vector::{
        EmbeddingProvider, HashingEmbeddingProvider, OpenAiEmbeddingProvider, SqliteVectorStore,
        VectorIndexClient, VectorIndexConfig,
    },
    tracing::{debug, info, warn},
};

pub struct KnowledgeBase {
    pub config: ExambankConfig,
    pub store: Arc<SqliteRecordStore>,
    pub index: Arc<VectorIndexClient>,
    pub sync: Arc<SyncManager>,
}

impl KnowledgeBase {
    /// Open both stores, declare the collections and attach the sync hook.
    pub async fn open(config: ExambankConfig) -> anyhow::Result<Self> {
        let store = Arc::new(
            SqliteRecordStore::new(&config.database.url, config.database.max_connections)
                .await
                .with_context(|| format!("failed to open record store {}", config.database.url))?,
        );
        let vectors =
            SqliteVectorStore::connect(&config.vector.url, config.database.max_connections)
                .await
                .with_context(|| format!("failed to open vector index {}", config.vector.url))?;

        let mut index = VectorIndexClient::new(Arc::new(vectors), vector_index_config(&config.vector))?;
        if let Some(embedder) = embedding_provider(config.embeddings.as_ref())? {
            index = index.with_embedder(embedder);
        }
        let index = Arc::new(index);
        index.ensure_collections().await?;

        let sync = SyncManager::attach(&store, Arc::clone(&index));
        info!(
            database = %config.database.url,
            vector = %config.vector.url,
            "knowledge base opened"
        );
        Ok(Self {
            config,
            store,
            index,
            sync,
        })
    }

    pub fn generator(&self) -> TestGenerator {
        let generator = TestGenerator::new(Arc::clone(&self.store), Arc::clone(&self.index));
        match self.config.exam.knowledge_point_strategy {
            KnowledgePointStrategy::Vector => generator,
            KnowledgePointStrategy::Keyword => match keyword_extractor(&self.config.keywords) {
                Some(extractor) => generator.with_keyword_extractor(extractor),
                None => {
                    warn!("keyword strategy selected but keywords.api_key is not set");
                    generator.with_knowledge_finder(QuestionFinder::Keyword)
                },
            },
        }
    }
}

pub fn vector_index_config(vector: &VectorConfig) -> VectorIndexConfig {
    VectorIndexConfig {
        max_length: vector.max_length,
        overlap: vector.overlap,
        over_fetch: vector.over_fetch,
        allow_reset: vector.allow_reset,
        collections: vector
            .collections
            .iter()
            .map(|(name, c)| (name.clone(), c.metadata_fields.clone()))
            .collect(),
    }
}

/// `None` keeps the vector store's default embedding.
pub fn embedding_provider(
    embeddings: Option<&EmbeddingsConfig>,
) -> anyhow::Result<Option<Arc<dyn EmbeddingProvider>>> {
    let Some(cfg) = embeddings else {
        debug!("no embeddings configured, using the store default");
        return Ok(None);
    };
    let provider: Arc<dyn EmbeddingProvider> = match cfg.provider {
        EmbeddingProviderKind::Hashing => Arc::new(HashingEmbeddingProvider::new(
            cfg.dimensions
                .unwrap_or(HashingEmbeddingProvider::DEFAULT_DIMENSIONS),
        )),
        EmbeddingProviderKind::Openai => {
            let api_key = cfg
                .api_key
                .clone()
                .context("embeddings.api_key is required for the openai provider")?;
            let mut provider = OpenAiEmbeddingProvider::new(api_key);
            if let Some(model) = &cfg.model {
                provider = provider.with_model(model.clone(), cfg.dimensions.unwrap_or(1536));
            }
            if let Some(url) = &cfg.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider)
        },
    };
    info!(model = provider.model_name(), dimensions = provider.dimensions(), "embedding provider configured");
    Ok(Some(provider))
}

pub fn keyword_extractor(keywords: &KeywordsConfig) -> Option<Arc<dyn KeywordExtractor>> {
    let api_key = keywords.api_key.clone()?;
    Some(Arc::new(
        OpenAiKeywordExtractor::new(api_key)
            .with_model(keywords.model.clone())
            .with_base_url(keywords.base_url.clone()),
    ))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        exambank_config::{DatabaseConfig, ExamConfig},
        secrecy::Secret,
    };

    fn in_memory() -> ExambankConfig {
        ExambankConfig {
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
            },
            vector: VectorConfig {
                url: "sqlite::memory:".into(),
                ..VectorConfig::default()
            },
            ..ExambankConfig::default()
        }
    }

    #[test]
    fn vector_settings_carry_over() {
        let vector = VectorConfig {
            max_length: 50,
            overlap: 5,
            allow_reset: true,
            ..VectorConfig::default()
        };
        let mapped = vector_index_config(&vector);
        assert_eq!(mapped.max_length, 50);
        assert_eq!(mapped.overlap, 5);
        assert!(mapped.allow_reset);
        assert_eq!(mapped.collections, VectorIndexConfig::default().collections);
    }

    #[test]
    fn openai_embeddings_need_a_key() {
        let cfg = EmbeddingsConfig {
            provider: EmbeddingProviderKind::Openai,
            model: None,
            dimensions: None,
            base_url: None,
            api_key: None,
        };
        assert!(embedding_provider(Some(&cfg)).is_err());
        assert!(embedding_provider(None).unwrap().is_none());
    }

    #[test]
    fn hashing_embeddings_use_configured_dimensions() {
        let cfg = EmbeddingsConfig {
            provider: EmbeddingProviderKind::Hashing,
            model: None,
            dimensions: Some(64),
            base_url: None,
            api_key: None,
        };
        let provider = embedding_provider(Some(&cfg)).unwrap().unwrap();
        assert_eq!(provider.dimensions(), 64);
    }

    #[test]
    fn keyword_extractor_requires_a_key() {
        assert!(keyword_extractor(&KeywordsConfig::default()).is_none());
        let keywords = KeywordsConfig {
            api_key: Some(Secret::new("sk-test".into())),
            ..KeywordsConfig::default()
        };
        assert!(keyword_extractor(&keywords).is_some());
    }

    #[tokio::test]
    async fn open_wires_the_sync_hook() {
        let kb = KnowledgeBase::open(in_memory()).await.unwrap();
        assert_eq!(kb.store.hook_names(), vec![exambank_sync::HOOK_NAME.to_string()]);
        assert_eq!(kb.index.collections().await.unwrap().len(), 2);
        assert_eq!(kb.generator().knowledge_finder(), QuestionFinder::Vector);
    }

    #[tokio::test]
    async fn keyword_strategy_selects_the_keyword_finder() {
        let mut config = in_memory();
        config.exam = ExamConfig {
            knowledge_point_strategy: KnowledgePointStrategy::Keyword,
            spec: None,
        };
        let kb = KnowledgeBase::open(config).await.unwrap();
        assert_eq!(kb.generator().knowledge_finder(), QuestionFinder::Keyword);
    }
}
