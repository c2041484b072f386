//! Sync manager: mirrors committed record mutations into the vector index.
use std::{collections::HashSet, sync::Arc};

use {
    async_trait::async_trait,
    exambank_common::{Record, RecordEvent, RecordHook},
    exambank_records::{RecordKind, SqliteRecordStore},
    exambank_vector::VectorIndexClient,
    serde::Serialize,
    tracing::{debug, error, info},
};

use crate::error::Result;

/// Hook name under which the manager registers with the record store.
pub const HOOK_NAME: &str = "vector-sync";

pub struct SyncManager {
    index: Arc<VectorIndexClient>,
}

/// Outcome of a [`SyncManager::full_resync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub questions: usize,
    pub knowledge_points: usize,
    /// Record uuids removed from the index because the store no longer has them.
    pub pruned: usize,
}

impl SyncManager {
    pub fn new(index: Arc<VectorIndexClient>) -> Self {
        Self { index }
    }

    /// Create a manager and subscribe it to every lifecycle event of `store`.
    pub fn attach(store: &SqliteRecordStore, index: Arc<VectorIndexClient>) -> Arc<Self> {
        let manager = Arc::new(Self::new(index));
        store.register_hook(Arc::clone(&manager) as Arc<dyn RecordHook>);
        info!(hook = HOOK_NAME, "vector sync attached to record store");
        manager
    }

    pub fn index(&self) -> &VectorIndexClient {
        &self.index
    }

    async fn propagate(
        &self,
        event: RecordEvent,
        kind: RecordKind,
        record: &dyn Record,
    ) -> exambank_vector::Result<()> {
        let attributes = record.attributes();
        match (event, kind) {
            (RecordEvent::AfterInsert, RecordKind::Questions) => {
                self.index.add_question(&attributes).await
            },
            (RecordEvent::AfterInsert, RecordKind::KnowledgePoints) => {
                self.index.add_knowledge_point(&attributes).await
            },
            (RecordEvent::AfterUpdate, kind) => {
                self.index
                    .update_document(kind.as_str(), record.uuid(), &attributes)
                    .await
            },
            (RecordEvent::AfterDelete, kind) => self
                .index
                .delete_document(kind.as_str(), record.uuid())
                .await
                .map(|_| ()),
        }
    }

    /// Re-index every record of the store, then drop index entries whose
    /// record no longer exists.
    ///
    /// Chunk ids are content addressed, so re-adding already indexed records
    /// overwrites them in place.
    pub async fn full_resync(&self, store: &SqliteRecordStore) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        for question in store.all_questions().await? {
            self.index.add_question(&question.attributes()).await?;
            report.questions += 1;
        }
        for point in store.all_knowledge_points().await? {
            self.index.add_knowledge_point(&point.attributes()).await?;
            report.knowledge_points += 1;
        }

        for kind in RecordKind::ALL {
            let live = store.uuids(*kind).await?;
            let indexed: HashSet<String> = self.index.uuids_in(kind.as_str()).await?;
            for stale in indexed.difference(&live) {
                let removed = self.index.delete_document(kind.as_str(), stale).await?;
                debug!(collection = %kind, uuid = %stale, removed, "pruned stale record");
                report.pruned += 1;
            }
        }

        info!(
            questions = report.questions,
            knowledge_points = report.knowledge_points,
            pruned = report.pruned,
            "full resync complete"
        );
        Ok(report)
    }
}

#[async_trait]
impl RecordHook for SyncManager {
    fn name(&self) -> &str {
        HOOK_NAME
    }

    async fn handle(&self, event: RecordEvent, record: &dyn Record) -> anyhow::Result<()> {
        let kind = match record.kind().parse::<RecordKind>() {
            Ok(kind) => kind,
            Err(reason) => {
                error!(
                    kind = record.kind(),
                    uuid = record.uuid(),
                    %event,
                    %reason,
                    "record kind not indexed, skipping propagation"
                );
                return Ok(());
            },
        };

        match self.propagate(event, kind, record).await {
            Ok(()) => {
                debug!(%event, collection = %kind, uuid = record.uuid(), "propagated");
                Ok(())
            },
            Err(e) => {
                error!(
                    %event,
                    collection = %kind,
                    uuid = record.uuid(),
                    error = %e,
                    "propagation failed"
                );
                Err(e.into())
            },
        }
    }
}
